//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" when the pipeline is ready, "error" when startup failed
    pub status: String,
    /// Module name ("churn-agent")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Configured storage backend, absent if startup failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_backend: Option<String>,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Last error message if any (for diagnostics)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let last_error = state.last_error.read().await.clone();

    let (status, storage_backend) = match state.orchestrator() {
        Ok(orchestrator) => ("ok", Some(orchestrator.storage_backend().to_string())),
        Err(_) => ("error", None),
    };

    Json(HealthResponse {
        status: status.to_string(),
        module: "churn-agent".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage_backend,
        uptime_seconds,
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
