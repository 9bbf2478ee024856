//! Error types for churn-agent
//!
//! Every error kind maps to a fixed HTTP status and a stable, generic
//! message. Internal detail (remote statuses, SQL errors, parse errors) is
//! logged here and never sent to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::services::{PipelineError, ValidationError};
use crate::storage::StorageError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body is not valid JSON for the endpoint (400)
    #[error("Invalid JSON request body: {0}")]
    InvalidJson(String),

    /// Request failed validation (400)
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Wrong HTTP method (405)
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Storage write failed (500)
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Clients could not be constructed at startup (500)
    #[error("Initialization failed: {0}")]
    Initialization(String),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(e) => ApiError::Validation(e),
            PipelineError::Storage(e) => ApiError::Storage(e),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Storage(_) | ApiError::Initialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the caller
    pub fn public_message(&self) -> String {
        match self {
            ApiError::InvalidJson(_) => "Invalid JSON request body.".to_string(),
            ApiError::Validation(e) => e.to_string(),
            ApiError::MethodNotAllowed => "Only POST method is allowed.".to_string(),
            ApiError::Storage(StorageError::Feedback(_)) => "Failed to store customer data.".to_string(),
            ApiError::Storage(StorageError::Prediction { .. }) => {
                "Failed to store churn prediction.".to_string()
            }
            ApiError::Initialization(_) => "Server initialization failed.".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let body = Json(json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
