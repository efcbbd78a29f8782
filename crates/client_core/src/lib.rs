use reqwest::{Client, StatusCode};
use shared::{
    domain::Counter,
    error::ApiError,
    protocol::{Procedure, ProcedureKind},
};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub mod view;

pub use view::CounterView;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{procedure} request failed: {source}")]
    Transport {
        procedure: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{procedure} failed with status {status}: {error}")]
    Api {
        procedure: &'static str,
        status: StatusCode,
        error: ApiError,
    },
}

#[derive(Debug, Clone)]
pub struct CounterClient {
    http: Client,
    base_url: Url,
}

impl CounterClient {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(server_url).map_err(|source| ClientError::InvalidUrl {
            url: server_url.to_string(),
            source,
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get_counter(&self) -> Result<Counter, ClientError> {
        self.call(Procedure::GetCounter).await
    }

    pub async fn increment_counter(&self) -> Result<Counter, ClientError> {
        self.call(Procedure::IncrementCounter).await
    }

    pub async fn decrement_counter(&self) -> Result<Counter, ClientError> {
        self.call(Procedure::DecrementCounter).await
    }

    pub async fn call(&self, procedure: Procedure) -> Result<Counter, ClientError> {
        let name = procedure.name();
        let url = self
            .base_url
            .join(procedure.route().trim_start_matches('/'))
            .map_err(|source| ClientError::InvalidUrl {
                url: self.base_url.to_string(),
                source,
            })?;
        let transport = |source: reqwest::Error| ClientError::Transport {
            procedure: name,
            source,
        };

        let request = match procedure.kind() {
            ProcedureKind::Query => self.http.get(url),
            ProcedureKind::Mutation => self.http.post(url),
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        debug!(procedure = name, %status, "counter call completed");

        if status.is_success() {
            return response.json::<Counter>().await.map_err(transport);
        }

        let body = response.text().await.map_err(transport)?;
        let error = serde_json::from_str::<ApiError>(&body)
            .unwrap_or_else(|_| ApiError::internal(body.trim().to_string()));
        Err(ClientError::Api {
            procedure: name,
            status,
            error,
        })
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
