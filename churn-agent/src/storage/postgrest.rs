//! PostgREST feedback store (Supabase REST API)
//!
//! Rows are written with `POST {base}/rest/v1/{table}` and
//! `Prefer: return=representation`, so every insert returns the stored row
//! including the server-assigned id. PostgREST offers no multi-request
//! transaction, so the trait's sequential saga is used unchanged.

use super::{FeedbackStore, StorageError};
use crate::models::{ChurnPrediction, FeedbackRecord, NewFeedback, NewPrediction, RecordId, SentimentLabel};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

const FEEDBACK_TABLE: &str = "customer_feedback";
const PREDICTIONS_TABLE: &str = "churn_predictions";

#[derive(Debug, Serialize)]
struct FeedbackInsert<'a> {
    nls_score: u8,
    feedback_text: &'a str,
    created_at: DateTime<Utc>,
    comment_sentiment: &'a str,
    comment_topics: &'a BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
struct FeedbackRow {
    id: IdValue,
    nls_score: u8,
    #[serde(default)]
    feedback_text: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    comment_sentiment: Option<String>,
    #[serde(default)]
    comment_topics: Option<BTreeSet<String>>,
}

#[derive(Debug, Serialize)]
struct PredictionInsert<'a> {
    customer_feedback_id: &'a str,
    churn_probability: f64,
    reason: &'a str,
    predicted_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct PredictionRow {
    id: IdValue,
    customer_feedback_id: IdValue,
    churn_probability: f64,
    reason: String,
    predicted_at: DateTime<Utc>,
}

/// Tables may use uuid (string) or bigint primary keys
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(i64),
}

impl From<IdValue> for RecordId {
    fn from(value: IdValue) -> Self {
        match value {
            IdValue::Text(s) => RecordId(s),
            IdValue::Number(n) => RecordId(n.to_string()),
        }
    }
}

/// Feedback store backed by a PostgREST endpoint
#[derive(Clone)]
pub struct PostgrestStore {
    http_client: reqwest::Client,
    rest_url: String,
    api_key: String,
}

impl PostgrestStore {
    /// `base_url` is the project URL; `/rest/v1` is appended
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }

    /// POST rows and return the first row of the representation
    async fn insert_returning<B, R>(
        &self,
        table: &str,
        query: &[(&str, &str)],
        prefer: &str,
        body: &B,
    ) -> Result<R, String>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.rest_url, table);

        let mut request = self
            .http_client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", prefer)
            .json(body);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("request to {} failed: {}", table, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| format!("reading {} response failed: {}", table, e))?;

        if !status.is_success() {
            tracing::debug!(table, status = status.as_u16(), body = %text, "PostgREST insert rejected");
            return Err(format!("{} insert returned status {}", table, status.as_u16()));
        }

        let mut rows: Vec<R> = serde_json::from_str(&text).map_err(|e| {
            tracing::debug!(table, body = %text, "Unparseable PostgREST response");
            format!("parsing {} response failed: {}", table, e)
        })?;

        if rows.is_empty() {
            return Err(format!("no {} row returned after insert", table));
        }
        Ok(rows.swap_remove(0))
    }
}

#[async_trait]
impl FeedbackStore for PostgrestStore {
    fn backend(&self) -> &'static str {
        "postgrest"
    }

    async fn insert_feedback(&self, feedback: &NewFeedback) -> Result<FeedbackRecord, StorageError> {
        let body = FeedbackInsert {
            nls_score: feedback.rating,
            feedback_text: &feedback.feedback_text,
            created_at: Utc::now(),
            comment_sentiment: feedback.sentiment.as_str(),
            comment_topics: &feedback.topics,
        };

        let row: FeedbackRow = self
            .insert_returning(FEEDBACK_TABLE, &[], "return=representation", &body)
            .await
            .map_err(StorageError::Feedback)?;

        Ok(FeedbackRecord {
            id: row.id.into(),
            rating: row.nls_score,
            feedback_text: row.feedback_text,
            created_at: row.created_at,
            sentiment: row
                .comment_sentiment
                .as_deref()
                .map(SentimentLabel::from_model_label)
                .unwrap_or_else(|| feedback.sentiment.clone()),
            topics: row.comment_topics.unwrap_or_default(),
        })
    }

    async fn insert_prediction(&self, prediction: &NewPrediction) -> Result<ChurnPrediction, StorageError> {
        let body = PredictionInsert {
            customer_feedback_id: prediction.feedback_id().as_str(),
            churn_probability: prediction.probability(),
            reason: prediction.reason(),
            predicted_at: prediction.predicted_at(),
        };

        let row: PredictionRow = self
            .insert_returning(
                PREDICTIONS_TABLE,
                &[("on_conflict", "customer_feedback_id")],
                "return=representation,resolution=merge-duplicates",
                &body,
            )
            .await
            .map_err(|message| StorageError::Prediction {
                feedback_id: prediction.feedback_id().clone(),
                message,
            })?;

        Ok(ChurnPrediction {
            id: row.id.into(),
            feedback_id: row.customer_feedback_id.into(),
            probability: row.churn_probability,
            reason: row.reason,
            predicted_at: row.predicted_at,
        })
    }
}
