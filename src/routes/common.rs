//! Common routes: health and readiness.

use crate::error::AppError;
use crate::response;
use crate::service::format_timestamp;
use crate::state::ServiceState;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use serde::Serialize;
use std::time::Duration;

pub const READY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    service: String,
    environment: &'static str,
    timestamp: String,
    uptime: u64,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
}

async fn health(State(state): State<ServiceState>) -> impl IntoResponse {
    response::success(HealthBody {
        status: "ok",
        service: state.service.clone(),
        environment: state.environment.as_str(),
        timestamp: format_timestamp(chrono::Utc::now()),
        uptime: state.uptime_secs(),
    })
}

async fn ready(State(state): State<ServiceState>) -> Result<impl IntoResponse, AppError> {
    if let Some(store) = &state.store {
        match tokio::time::timeout(READY_TIMEOUT, store.ping()).await {
            Err(_) => {
                tracing::warn!("readiness probe timed out");
                return Err(AppError::Unavailable("database timeout".into()));
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "readiness probe failed");
                return Err(AppError::Unavailable("database unavailable".into()));
            }
            Ok(Ok(())) => {}
        }
    }
    Ok(response::success(ReadyBody { status: "ready" }))
}

/// GET /health, GET /healthz, GET /ready.
pub fn common_routes(state: ServiceState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready))
        .with_state(state)
}
