//! Persistence of feedback records and churn predictions
//!
//! Writes are causally ordered: a prediction insert can only be built from a
//! feedback record the store has already returned (see
//! [`NewPrediction::for_feedback`]).
//!
//! Backends:
//! - [`SqliteStore`]: both inserts in one transaction
//! - [`PostgrestStore`]: sequential inserts; the prediction write is an
//!   upsert keyed by the feedback id, so repeating it cannot duplicate rows.
//!   A failed prediction write leaves the feedback row in place.

pub mod postgrest;
pub mod sqlite;

pub use postgrest::PostgrestStore;
pub use sqlite::SqliteStore;

use crate::models::{ChurnPrediction, ChurnRisk, FeedbackRecord, NewFeedback, NewPrediction, RecordId};
use async_trait::async_trait;
use thiserror::Error;

/// Storage failures, tagged by the write that failed
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to insert feedback record: {0}")]
    Feedback(String),

    #[error("Failed to insert churn prediction for feedback {feedback_id}: {message}")]
    Prediction { feedback_id: RecordId, message: String },
}

/// Durable store for feedback and predictions
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Backend name for logs and health reporting
    fn backend(&self) -> &'static str;

    /// Insert a feedback record; the store assigns id and creation time
    async fn insert_feedback(&self, feedback: &NewFeedback) -> Result<FeedbackRecord, StorageError>;

    /// Insert the prediction linked to an already persisted feedback record
    async fn insert_prediction(&self, prediction: &NewPrediction) -> Result<ChurnPrediction, StorageError>;

    /// Persist feedback, then its prediction
    ///
    /// Sequential by default: the prediction write starts only after the
    /// feedback write returned its id. Backends with transactions override
    /// this to make the pair atomic.
    async fn record_scored_feedback(
        &self,
        feedback: &NewFeedback,
        risk: ChurnRisk,
    ) -> Result<(FeedbackRecord, ChurnPrediction), StorageError> {
        let record = self.insert_feedback(feedback).await?;
        tracing::info!(feedback_id = %record.id, backend = self.backend(), "Feedback stored");

        let prediction = self
            .insert_prediction(&NewPrediction::for_feedback(&record, risk))
            .await?;

        Ok((record, prediction))
    }
}
