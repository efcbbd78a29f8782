use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use server_api::{decrement_counter, get_counter, increment_counter, ApiContext};
use shared::{
    domain::Counter,
    error::{ApiError, ErrorCode},
    protocol::{Procedure, HEALTHZ_ROUTE},
};
use storage::{normalize_database_url, Storage};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::load_settings;

/// Procedures take no input, so anything beyond a token body is rejected.
const MAX_REQUEST_BODY_BYTES: usize = 1024;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            error = ?error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext::from(storage.clone()),
        storage,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "counter server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(HEALTHZ_ROUTE, get(healthz))
        .route(Procedure::GetCounter.route(), get(http_get_counter))
        .route(Procedure::IncrementCounter.route(), post(http_increment_counter))
        .route(Procedure::DecrementCounter.route(), post(http_decrement_counter))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .with_state(state)
}

async fn healthz(
    State(state): State<Arc<AppState>>,
) -> Result<&'static str, (StatusCode, Json<ApiError>)> {
    state.storage.health_check().await.map_err(|e| {
        warn!(error = %e, "health check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::Unavailable, e.to_string())),
        )
    })?;
    Ok("ok")
}

async fn http_get_counter(State(state): State<Arc<AppState>>) -> ApiResult<Counter> {
    let counter = get_counter(&state.api).await.map_err(server_error)?;
    Ok(Json(counter))
}

async fn http_increment_counter(State(state): State<Arc<AppState>>) -> ApiResult<Counter> {
    let counter = increment_counter(&state.api).await.map_err(server_error)?;
    info!(counter_id = counter.id.0, value = counter.value, "counter incremented");
    Ok(Json(counter))
}

async fn http_decrement_counter(State(state): State<Arc<AppState>>) -> ApiResult<Counter> {
    let counter = decrement_counter(&state.api).await.map_err(server_error)?;
    info!(counter_id = counter.id.0, value = counter.value, "counter decremented");
    Ok(Json(counter))
}

fn server_error(err: ApiError) -> (StatusCode, Json<ApiError>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
