//! Churn prediction endpoint
//!
//! `POST /predict` takes `{"rating": 0..=10, "feedback_text": "..."}`
//! (`nls_score` is accepted as an alias for `rating`) and answers with the
//! stored feedback id and the churn prediction. Any other method on the
//! path gets 405.

use std::collections::BTreeSet;

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::models::FeedbackCommand;
use crate::services::PredictionOutcome;
use crate::AppState;

/// Successful prediction response
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    /// Id of the stored feedback record
    pub customer_id: String,
    pub churn_probability: f64,
    pub reason: String,
    pub comment_sentiment: String,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub comment_topics: BTreeSet<String>,
}

impl From<PredictionOutcome> for PredictResponse {
    fn from(outcome: PredictionOutcome) -> Self {
        Self {
            customer_id: outcome.feedback.id.0,
            churn_probability: outcome.prediction.probability,
            reason: outcome.prediction.reason,
            comment_sentiment: outcome.feedback.sentiment.to_string(),
            comment_topics: outcome.feedback.topics,
        }
    }
}

/// POST /predict
///
/// The body is taken raw so malformed JSON maps to the service's own 400
/// message instead of axum's extractor rejection.
pub async fn predict(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<PredictResponse>> {
    let orchestrator = state.orchestrator()?;

    let command: FeedbackCommand =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidJson(e.to_string()))?;

    match orchestrator.process(command).await {
        Ok(outcome) => Ok(Json(PredictResponse::from(outcome))),
        Err(err) => {
            let err = ApiError::from(err);
            if err.status().is_server_error() {
                // /health is unauthenticated; detail stays in the log
                state.record_error(err.public_message()).await;
            }
            Err(err)
        }
    }
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Build prediction routes
pub fn predict_routes() -> Router<AppState> {
    Router::new().route("/predict", post(predict).fallback(method_not_allowed))
}
