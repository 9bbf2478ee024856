//! Text inference API client
//!
//! Talks to a Hugging Face Inference API compatible endpoint:
//! `POST {base_url}/{model_id}` with a bearer token.
//!
//! Two models are used:
//! - a single-label sentiment classifier (`[[{label, score}, ...]]`)
//! - a multi-label zero-shot classifier (`{sequence, labels, scores}`)
//!
//! Every call is attempted once and bounded by the client timeout.

use async_trait::async_trait;
use churn_common::config::InferenceConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("churn-agent/", env!("CARGO_PKG_VERSION"));

/// Inference client errors
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Inference API token not configured")]
    MissingToken,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Model {model} is loading (retry in {estimated_secs:.0}s): {message}")]
    ModelLoading {
        model: String,
        estimated_secs: f64,
        message: String,
    },

    #[error("API error {status} for {model}: {message}")]
    ApiError {
        model: String,
        status: u16,
        message: String,
    },

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// One (label, score) pair from a classifier
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Zero-shot classification result; `labels[i]` scored `scores[i]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ZeroShotOutput {
    #[serde(default)]
    pub sequence: String,
    pub labels: Vec<String>,
    pub scores: Vec<f64>,
}

impl ZeroShotOutput {
    /// Pair labels with scores; `None` when the lengths disagree
    pub fn pairs(&self) -> Option<impl Iterator<Item = (&str, f64)>> {
        if self.labels.len() != self.scores.len() {
            return None;
        }
        Some(
            self.labels
                .iter()
                .map(String::as_str)
                .zip(self.scores.iter().copied()),
        )
    }
}

/// Remote text classification, the seam enrichment is built on
#[async_trait]
pub trait TextInference: Send + Sync {
    /// Single-label sentiment classification; returns the first result group
    async fn classify_sentiment(&self, text: &str) -> Result<Vec<LabelScore>, InferenceError>;

    /// Multi-label zero-shot classification against `candidate_labels`
    async fn classify_zero_shot(
        &self,
        text: &str,
        candidate_labels: &[String],
    ) -> Result<ZeroShotOutput, InferenceError>;
}

#[derive(Debug, Serialize)]
struct SentimentRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [String],
    multi_label: bool,
}

/// Error body returned with non-200 statuses
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
    #[serde(default)]
    estimated_time: Option<f64>,
}

/// Hugging Face Inference API client
#[derive(Clone)]
pub struct HuggingFaceClient {
    http_client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    sentiment_model: String,
    zero_shot_model: String,
}

impl HuggingFaceClient {
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        Self::with_timeout(config, config.timeout())
    }

    pub fn with_timeout(config: &InferenceConfig, timeout: Duration) -> Result<Self, InferenceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone().filter(|t| !t.trim().is_empty()),
            sentiment_model: config.sentiment_model.clone(),
            zero_shot_model: config.zero_shot_model.clone(),
        })
    }

    /// Check if an API token is configured
    pub fn is_configured(&self) -> bool {
        self.api_token.is_some()
    }

    fn model_url(&self, model_id: &str) -> String {
        format!("{}/{}", self.base_url, model_id)
    }

    /// POST a JSON payload to a model and return the raw success body
    async fn call_model<T: Serialize + ?Sized>(
        &self,
        model_id: &str,
        payload: &T,
    ) -> Result<Vec<u8>, InferenceError> {
        let token = self.api_token.as_deref().ok_or(InferenceError::MissingToken)?;
        let url = self.model_url(model_id);

        tracing::debug!(model = model_id, "Calling inference API");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(|e| InferenceError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| InferenceError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            tracing::debug!(
                model = model_id,
                status = status.as_u16(),
                body = %String::from_utf8_lossy(&body),
                "Inference API returned non-success status"
            );
            return Err(api_error(model_id, status.as_u16(), &body));
        }

        Ok(body.to_vec())
    }
}

fn parse_body<T: DeserializeOwned>(model_id: &str, body: &[u8]) -> Result<T, InferenceError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(
            model = model_id,
            body = %String::from_utf8_lossy(body),
            "Unparseable inference response"
        );
        InferenceError::ParseError(e.to_string())
    })
}

fn api_error(model_id: &str, status: u16, body: &[u8]) -> InferenceError {
    match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.is_empty() => match parsed.estimated_time {
            Some(estimated_secs) if estimated_secs > 0.0 => InferenceError::ModelLoading {
                model: model_id.to_string(),
                estimated_secs,
                message: parsed.error,
            },
            _ => InferenceError::ApiError {
                model: model_id.to_string(),
                status,
                message: parsed.error,
            },
        },
        _ => InferenceError::ApiError {
            model: model_id.to_string(),
            status,
            message: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

#[async_trait]
impl TextInference for HuggingFaceClient {
    async fn classify_sentiment(&self, text: &str) -> Result<Vec<LabelScore>, InferenceError> {
        let body = self
            .call_model(&self.sentiment_model, &SentimentRequest { inputs: text })
            .await?;

        let groups: Vec<Vec<LabelScore>> = parse_body(&self.sentiment_model, &body)?;
        Ok(groups.into_iter().next().unwrap_or_default())
    }

    async fn classify_zero_shot(
        &self,
        text: &str,
        candidate_labels: &[String],
    ) -> Result<ZeroShotOutput, InferenceError> {
        let request = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels,
                multi_label: true,
            },
        };

        let body = self.call_model(&self.zero_shot_model, &request).await?;
        parse_body(&self.zero_shot_model, &body)
    }
}
