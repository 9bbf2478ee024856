//! Shared test doubles for churn-agent integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use churn_agent::models::{ChurnPrediction, FeedbackRecord, NewFeedback, NewPrediction, RecordId};
use churn_agent::services::{
    FeedbackEnricher, FeedbackOrchestrator, FeedbackValidator, InferenceError, LabelScore, TextInference,
    ZeroShotOutput,
};
use churn_agent::storage::{FeedbackStore, SqliteStore, StorageError};

pub fn candidate_topics() -> Vec<String> {
    churn_common::config::DEFAULT_CANDIDATE_TOPICS
        .iter()
        .map(|t| t.to_string())
        .collect()
}

/// Inference double with canned answers and call counters
#[derive(Default)]
pub struct FakeInference {
    sentiment: Option<Vec<LabelScore>>,
    zero_shot: Option<Vec<(String, f64)>>,
    pub sentiment_calls: AtomicUsize,
    pub zero_shot_calls: AtomicUsize,
}

impl FakeInference {
    /// Answers with `label` at 0.99 and the given topic scores
    pub fn answering(label: &str, topics: &[(&str, f64)]) -> Self {
        Self {
            sentiment: Some(vec![LabelScore {
                label: label.to_string(),
                score: 0.99,
            }]),
            zero_shot: Some(topics.iter().map(|(l, s)| (l.to_string(), *s)).collect()),
            ..Self::default()
        }
    }

    /// Every call fails with a network error
    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn total_calls(&self) -> usize {
        self.sentiment_calls.load(Ordering::SeqCst) + self.zero_shot_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextInference for FakeInference {
    async fn classify_sentiment(&self, _text: &str) -> Result<Vec<LabelScore>, InferenceError> {
        self.sentiment_calls.fetch_add(1, Ordering::SeqCst);
        self.sentiment
            .clone()
            .ok_or_else(|| InferenceError::NetworkError("connection refused".to_string()))
    }

    async fn classify_zero_shot(
        &self,
        text: &str,
        _candidate_labels: &[String],
    ) -> Result<ZeroShotOutput, InferenceError> {
        self.zero_shot_calls.fetch_add(1, Ordering::SeqCst);
        let pairs = self
            .zero_shot
            .clone()
            .ok_or_else(|| InferenceError::NetworkError("connection refused".to_string()))?;
        Ok(ZeroShotOutput {
            sequence: text.to_string(),
            labels: pairs.iter().map(|(l, _)| l.clone()).collect(),
            scores: pairs.iter().map(|(_, s)| *s).collect(),
        })
    }
}

/// Which write a [`FailingStore`] rejects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Feedback,
    Prediction,
}

/// Store that fails one of the two writes and counts attempts
pub struct FailingStore {
    fail_at: FailAt,
    pub feedback_writes: AtomicUsize,
    pub prediction_writes: AtomicUsize,
}

impl FailingStore {
    pub fn new(fail_at: FailAt) -> Self {
        Self {
            fail_at,
            feedback_writes: AtomicUsize::new(0),
            prediction_writes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FeedbackStore for FailingStore {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn insert_feedback(&self, feedback: &NewFeedback) -> Result<FeedbackRecord, StorageError> {
        self.feedback_writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == FailAt::Feedback {
            return Err(StorageError::Feedback("disk I/O error".to_string()));
        }
        Ok(FeedbackRecord {
            id: RecordId("fb-1".to_string()),
            rating: feedback.rating,
            feedback_text: feedback.feedback_text.clone(),
            created_at: Utc::now(),
            sentiment: feedback.sentiment.clone(),
            topics: feedback.topics.clone(),
        })
    }

    async fn insert_prediction(&self, prediction: &NewPrediction) -> Result<ChurnPrediction, StorageError> {
        self.prediction_writes.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Prediction {
            feedback_id: prediction.feedback_id().clone(),
            message: "status 503".to_string(),
        })
    }
}

/// SQLite store over a fresh in-memory database
pub async fn memory_store() -> SqliteStore {
    let pool = churn_common::db::init_in_memory().await.unwrap();
    SqliteStore::new(pool)
}

pub fn orchestrator(
    inference: Arc<FakeInference>,
    store: Arc<dyn FeedbackStore>,
    validator: FeedbackValidator,
) -> FeedbackOrchestrator {
    let enricher = FeedbackEnricher::from_inference(inference, candidate_topics(), 0.8);
    FeedbackOrchestrator::new(validator, enricher, store)
}
