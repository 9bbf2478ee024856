//! # Feedback Orchestrator
//!
//! Coordinates one prediction request:
//! 1. Validate the command
//! 2. Enrich the text (sentiment + topics, concurrently, never fatal)
//! 3. Score churn risk
//! 4. Persist feedback, then the linked prediction
//!
//! Validation and storage errors stop the pipeline; enrichment failures are
//! already folded into degraded values by the time scoring runs.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::info;

use crate::models::{ChurnPrediction, FeedbackCommand, FeedbackRecord, NewFeedback};
use crate::services::enrichment::FeedbackEnricher;
use crate::services::scoring::score_churn;
use crate::services::validator::{FeedbackValidator, ValidationError};
use crate::storage::{FeedbackStore, StorageError};

/// Pipeline failures that stop processing
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result of a successful pipeline run
#[derive(Debug)]
pub struct PredictionOutcome {
    pub feedback: FeedbackRecord,
    pub prediction: ChurnPrediction,
    /// Whether sentiment fell back to its default
    pub sentiment_degraded: bool,
    /// Whether topics fell back to their default
    pub topics_degraded: bool,
}

/// Runs validate → enrich → score → persist
#[derive(Clone)]
pub struct FeedbackOrchestrator {
    validator: FeedbackValidator,
    enricher: FeedbackEnricher,
    store: Arc<dyn FeedbackStore>,
}

impl FeedbackOrchestrator {
    pub fn new(validator: FeedbackValidator, enricher: FeedbackEnricher, store: Arc<dyn FeedbackStore>) -> Self {
        Self {
            validator,
            enricher,
            store,
        }
    }

    pub fn storage_backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Main entry point: process one feedback command
    pub async fn process(&self, command: FeedbackCommand) -> Result<PredictionOutcome, PipelineError> {
        let start_time = Instant::now();

        let validated = self.validator.validate(command)?;

        let insights = self.enricher.enrich(&validated.feedback_text).await;
        let sentiment_degraded = insights.sentiment.is_degraded();
        let topics_degraded = insights.topics.is_degraded();
        let sentiment = insights.sentiment.into_value();
        let topics = insights.topics.into_value();
        info!(
            sentiment = %sentiment,
            topics = ?topics,
            sentiment_degraded,
            topics_degraded,
            "Feedback enriched"
        );

        let risk = score_churn(validated.rating, &validated.feedback_text, &sentiment);

        let new_feedback = NewFeedback {
            rating: validated.rating,
            feedback_text: validated.feedback_text,
            sentiment,
            topics,
        };
        let (feedback, prediction) = self.store.record_scored_feedback(&new_feedback, risk).await?;

        info!(
            feedback_id = %feedback.id,
            churn_probability = prediction.probability,
            elapsed = ?start_time.elapsed(),
            "Churn prediction stored"
        );

        Ok(PredictionOutcome {
            feedback,
            prediction,
            sentiment_degraded,
            topics_degraded,
        })
    }
}
