//! SQLite feedback store
//!
//! Uses the schema from `churn_common::db`. Both inserts of a scored
//! feedback run in one transaction, so a failed prediction write leaves no
//! feedback row behind.

use super::{FeedbackStore, StorageError};
use crate::models::{
    ChurnPrediction, ChurnRisk, FeedbackRecord, NewFeedback, NewPrediction, RecordId, SentimentLabel,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};
use std::collections::BTreeSet;

/// Feedback store backed by a SQLite pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Load a feedback record by id
    pub async fn fetch_feedback(&self, id: &RecordId) -> Result<Option<FeedbackRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, nls_score, feedback_text, created_at, comment_sentiment, comment_topics
            FROM customer_feedback
            WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(feedback_from_row).transpose()
    }

    /// Load the prediction linked to a feedback record
    pub async fn fetch_prediction_for(&self, feedback_id: &RecordId) -> Result<Option<ChurnPrediction>> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_feedback_id, churn_probability, reason, predicted_at
            FROM churn_predictions
            WHERE customer_feedback_id = ?
            "#,
        )
        .bind(feedback_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(prediction_from_row).transpose()
    }

    /// Delete a feedback record; its prediction is removed by cascade.
    /// Returns whether a row was deleted.
    pub async fn delete_feedback(&self, id: &RecordId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM customer_feedback WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl FeedbackStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn insert_feedback(&self, feedback: &NewFeedback) -> Result<FeedbackRecord, StorageError> {
        insert_feedback_row(&self.pool, feedback)
            .await
            .map_err(|e| StorageError::Feedback(format!("{:#}", e)))
    }

    async fn insert_prediction(&self, prediction: &NewPrediction) -> Result<ChurnPrediction, StorageError> {
        insert_prediction_row(&self.pool, prediction)
            .await
            .map_err(|e| prediction_error(prediction.feedback_id(), e))
    }

    async fn record_scored_feedback(
        &self,
        feedback: &NewFeedback,
        risk: ChurnRisk,
    ) -> Result<(FeedbackRecord, ChurnPrediction), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Feedback(format!("begin transaction: {}", e)))?;

        let record = insert_feedback_row(&mut *tx, feedback)
            .await
            .map_err(|e| StorageError::Feedback(format!("{:#}", e)))?;

        let new_prediction = NewPrediction::for_feedback(&record, risk);
        let prediction = insert_prediction_row(&mut *tx, &new_prediction)
            .await
            .map_err(|e| prediction_error(&record.id, e))?;

        // Nothing is durable until commit, so a commit failure loses the feedback too
        tx.commit()
            .await
            .map_err(|e| StorageError::Feedback(format!("commit transaction: {}", e)))?;

        tracing::info!(
            feedback_id = %record.id,
            prediction_id = %prediction.id,
            "Feedback and prediction committed"
        );

        Ok((record, prediction))
    }
}

fn prediction_error(feedback_id: &RecordId, e: anyhow::Error) -> StorageError {
    StorageError::Prediction {
        feedback_id: feedback_id.clone(),
        message: format!("{:#}", e),
    }
}

async fn insert_feedback_row<'e, E>(executor: E, feedback: &NewFeedback) -> Result<FeedbackRecord>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let topics_json = serde_json::to_string(&feedback.topics).context("Encoding topics")?;

    let row = sqlx::query(
        r#"
        INSERT INTO customer_feedback (nls_score, feedback_text, comment_sentiment, comment_topics)
        VALUES (?, ?, ?, ?)
        RETURNING id, nls_score, feedback_text, created_at, comment_sentiment, comment_topics
        "#,
    )
    .bind(i64::from(feedback.rating))
    .bind(&feedback.feedback_text)
    .bind(feedback.sentiment.as_str())
    .bind(topics_json)
    .fetch_one(executor)
    .await
    .context("INSERT customer_feedback")?;

    feedback_from_row(&row)
}

/// Upsert keyed by `customer_feedback_id`; repeating the write for the same
/// feedback id rewrites the same row
async fn insert_prediction_row<'e, E>(executor: E, prediction: &NewPrediction) -> Result<ChurnPrediction>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        INSERT INTO churn_predictions (customer_feedback_id, churn_probability, reason, predicted_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(customer_feedback_id) DO UPDATE SET
            churn_probability = excluded.churn_probability,
            reason = excluded.reason,
            predicted_at = excluded.predicted_at
        RETURNING id, customer_feedback_id, churn_probability, reason, predicted_at
        "#,
    )
    .bind(prediction.feedback_id().as_str())
    .bind(prediction.probability())
    .bind(prediction.reason())
    .bind(format_timestamp(prediction.predicted_at()))
    .fetch_one(executor)
    .await
    .context("INSERT churn_predictions")?;

    prediction_from_row(&row)
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid timestamp '{}'", value))?
        .with_timezone(&Utc))
}

fn feedback_from_row(row: &SqliteRow) -> Result<FeedbackRecord> {
    let rating: i64 = row.try_get("nls_score")?;
    let created_at: String = row.try_get("created_at")?;
    let sentiment: String = row.try_get("comment_sentiment")?;
    let topics_json: String = row.try_get("comment_topics")?;

    Ok(FeedbackRecord {
        id: RecordId(row.try_get("id")?),
        rating: u8::try_from(rating).with_context(|| format!("nls_score {} out of range", rating))?,
        feedback_text: row.try_get("feedback_text")?,
        created_at: parse_timestamp(&created_at)?,
        sentiment: SentimentLabel::from_model_label(&sentiment),
        topics: serde_json::from_str::<BTreeSet<String>>(&topics_json).context("Decoding topics")?,
    })
}

fn prediction_from_row(row: &SqliteRow) -> Result<ChurnPrediction> {
    let predicted_at: String = row.try_get("predicted_at")?;

    Ok(ChurnPrediction {
        id: RecordId(row.try_get("id")?),
        feedback_id: RecordId(row.try_get("customer_feedback_id")?),
        probability: row.try_get("churn_probability")?,
        reason: row.try_get("reason")?,
        predicted_at: parse_timestamp(&predicted_at)?,
    })
}
