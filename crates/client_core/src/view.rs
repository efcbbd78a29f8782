use chrono::Local;
use shared::{domain::Counter, protocol::Procedure};
use tracing::error;

use crate::{ClientError, CounterClient};

#[derive(Debug, Default)]
pub struct CounterView {
    counter: Option<Counter>,
    is_loading: bool,
}

impl CounterView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self) -> Option<&Counter> {
        self.counter.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn controls_enabled(&self) -> bool {
        self.counter.is_some() && !self.is_loading
    }

    pub fn apply_load(&mut self, result: Result<Counter, ClientError>) {
        match result {
            Ok(counter) => self.counter = Some(counter),
            Err(err) => error!(error = %err, "failed to load counter"),
        }
    }

    /// Marks a mutation as in flight. Returns `false` when one already is.
    pub fn begin_mutation(&mut self) -> bool {
        if self.is_loading {
            return false;
        }
        self.is_loading = true;
        true
    }

    pub fn finish_mutation(&mut self, procedure: Procedure, result: Result<Counter, ClientError>) {
        match result {
            Ok(counter) => self.counter = Some(counter),
            Err(err) => error!(procedure = procedure.name(), error = %err, "counter mutation failed"),
        }
        self.is_loading = false;
    }

    pub async fn refresh(&mut self, client: &CounterClient) {
        let result = client.get_counter().await;
        self.apply_load(result);
    }

    pub async fn mutate(&mut self, client: &CounterClient, procedure: Procedure) {
        if !self.begin_mutation() {
            return;
        }
        let result = client.call(procedure).await;
        self.finish_mutation(procedure, result);
    }

    pub fn render(&self) -> String {
        let Some(counter) = &self.counter else {
            return "Loading...".to_string();
        };

        let updated_at = counter.updated_at.with_timezone(&Local);
        let mut out = format!(
            "Counter\n{}\nLast updated: {}\n",
            counter.value,
            updated_at.format("%Y-%m-%d %H:%M:%S")
        );
        if self.is_loading {
            out.push_str("Updating...\n");
        } else {
            out.push_str("[-] decrement   [+] increment\n");
        }
        out
    }
}
