use anyhow::Result;
use clap::{Parser, Subcommand};
use storage::{CounterStore, Storage, DEFAULT_DATABASE_URL};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canonical counter, creating it if the table is empty.
    Show,
    /// Print every counter record, including duplicates.
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    for line in run(&storage, &cli.command).await? {
        println!("{line}");
    }

    Ok(())
}

async fn run(storage: &Storage, command: &Command) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    match command {
        Command::Show => {
            let counter = storage.fetch_or_create().await?;
            lines.push(serde_json::to_string_pretty(&counter)?);
        }
        Command::List => {
            let counters = storage.list_counters().await?;
            if counters.len() > 1 {
                lines.push(format!(
                    "{} records; id={} is canonical",
                    counters.len(),
                    counters[0].id.0
                ));
            }
            for counter in counters {
                lines.push(serde_json::to_string(&counter)?);
            }
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::{Counter, Delta};

    async fn open_in_tempdir() -> (tempfile::TempDir, Storage) {
        let temp_root = tempfile::tempdir().expect("tempdir");
        let db_path = temp_root.path().join("newdir").join("counter.db");
        let storage = Storage::new(db_path.to_string_lossy().as_ref())
            .await
            .expect("db");
        (temp_root, storage)
    }

    #[test]
    fn database_url_defaults_to_server_location() {
        let cli = Cli::parse_from(["tools", "show"]);
        if std::env::var_os("DATABASE_URL").is_none() {
            assert_eq!(cli.database_url, DEFAULT_DATABASE_URL);
        }
        assert!(matches!(cli.command, Command::Show));
    }

    #[tokio::test]
    async fn show_creates_and_prints_counter() {
        let (_temp_root, storage) = open_in_tempdir().await;

        let lines = run(&storage, &Command::Show).await.expect("show");
        assert_eq!(lines.len(), 1);
        let counter: Counter = serde_json::from_str(&lines[0]).expect("counter json");
        assert_eq!(counter.value, 0);
        assert_eq!(storage.list_counters().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn list_prints_every_record_and_names_the_canonical_one() {
        let (_temp_root, storage) = open_in_tempdir().await;
        assert!(run(&storage, &Command::List).await.expect("list").is_empty());

        let canonical = storage.apply_delta(Delta::INCREMENT).await.expect("increment");
        sqlx::query("INSERT INTO counters (value) VALUES (20)")
            .execute(storage.pool())
            .await
            .expect("duplicate");

        let lines = run(&storage, &Command::List).await.expect("list");
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            format!("2 records; id={} is canonical", canonical.id.0)
        );
        let first: Counter = serde_json::from_str(&lines[1]).expect("counter json");
        assert_eq!(first, canonical);
    }
}
