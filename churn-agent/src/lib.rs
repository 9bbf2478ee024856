//! churn-agent library interface
//!
//! Exposes the pipeline, storage backends and HTTP router for the binary
//! and for integration tests.

pub mod api;
pub mod bootstrap;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::services::FeedbackOrchestrator;

/// Pipeline availability, decided once at startup
#[derive(Clone)]
pub enum Pipeline {
    Ready(Arc<FeedbackOrchestrator>),
    /// Startup could not construct the clients; every prediction request
    /// fails until the configuration is fixed and the service restarted
    Unavailable(Arc<str>),
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(orchestrator: FeedbackOrchestrator) -> Self {
        Self::with_pipeline(Pipeline::Ready(Arc::new(orchestrator)), None)
    }

    /// State for a service whose startup failed. `reason` is kept for
    /// logging only; `/health` reports the generic summary.
    pub fn initialization_failed(reason: impl Into<String>) -> Self {
        let reason: String = reason.into();
        let summary = ApiError::Initialization(String::new()).public_message();
        Self::with_pipeline(Pipeline::Unavailable(Arc::from(reason.as_str())), Some(summary))
    }

    fn with_pipeline(pipeline: Pipeline, last_error: Option<String>) -> Self {
        Self {
            pipeline,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(last_error)),
        }
    }

    pub fn orchestrator(&self) -> ApiResult<&FeedbackOrchestrator> {
        match &self.pipeline {
            Pipeline::Ready(orchestrator) => Ok(orchestrator.as_ref()),
            Pipeline::Unavailable(reason) => Err(ApiError::Initialization(reason.to_string())),
        }
    }

    pub async fn record_error(&self, message: String) {
        *self.last_error.write().await = Some(message);
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::predict_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
