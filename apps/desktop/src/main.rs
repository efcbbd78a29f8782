use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{CounterClient, CounterView};
use shared::protocol::Procedure;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:8443")]
    server_url: String,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Get,
    Increment,
    Decrement,
}

impl Command {
    fn procedure(&self) -> Procedure {
        match self {
            Command::Get => Procedure::GetCounter,
            Command::Increment => Procedure::IncrementCounter,
            Command::Decrement => Procedure::DecrementCounter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Mutate(Procedure),
    Reload,
    Quit,
}

fn parse_action(line: &str) -> Option<Action> {
    match line.trim() {
        "+" | "inc" | "increment" => Some(Action::Mutate(Procedure::IncrementCounter)),
        "-" | "dec" | "decrement" => Some(Action::Mutate(Procedure::DecrementCounter)),
        "r" | "reload" => Some(Action::Reload),
        "q" | "quit" | "exit" => Some(Action::Quit),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let client = CounterClient::new(&args.server_url)?;

    if let Some(command) = args.command {
        let counter = client.call(command.procedure()).await?;
        println!("{}", serde_json::to_string_pretty(&counter)?);
        return Ok(());
    }

    run_interactive(&client).await
}

async fn run_interactive(client: &CounterClient) -> Result<()> {
    let mut view = CounterView::new();
    view.refresh(client).await;
    println!("{}", view.render());
    println!("commands: + (increment), - (decrement), r (reload), q (quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_action(&line) {
            Some(Action::Quit) => break,
            Some(Action::Reload) => view.refresh(client).await,
            Some(Action::Mutate(procedure)) => {
                if view.counter().is_none() {
                    println!("counter not loaded yet; try r to reload");
                    continue;
                }
                view.mutate(client, procedure).await;
            }
            None => {
                println!("unknown command: {}", line.trim());
                continue;
            }
        }
        println!("{}", view.render());
    }

    Ok(())
}
