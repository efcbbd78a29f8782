use std::sync::Arc;

use shared::{
    domain::{Counter, Delta},
    error::ApiError,
};
use storage::{CounterStore, Storage};
use tracing::error;

#[derive(Clone)]
pub struct ApiContext {
    pub store: Arc<dyn CounterStore>,
}

impl ApiContext {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }
}

impl From<Storage> for ApiContext {
    fn from(storage: Storage) -> Self {
        Self::new(Arc::new(storage))
    }
}

pub async fn get_counter(ctx: &ApiContext) -> Result<Counter, ApiError> {
    ctx.store
        .fetch_or_create()
        .await
        .map_err(|err| internal("get counter", err))
}

pub async fn increment_counter(ctx: &ApiContext) -> Result<Counter, ApiError> {
    apply(ctx, Delta::INCREMENT, "increment counter").await
}

pub async fn decrement_counter(ctx: &ApiContext) -> Result<Counter, ApiError> {
    apply(ctx, Delta::DECREMENT, "decrement counter").await
}

async fn apply(ctx: &ApiContext, delta: Delta, operation: &str) -> Result<Counter, ApiError> {
    ctx.store
        .apply_delta(delta)
        .await
        .map_err(|err| internal(operation, err))
}

fn internal(operation: &str, err: anyhow::Error) -> ApiError {
    let message = format!("{err:#}");
    error!(operation, error = %message, "counter storage operation failed");
    ApiError::internal(message)
}
