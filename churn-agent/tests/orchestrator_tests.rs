//! Pipeline tests: validation, enrichment degradation, scoring and
//! persistence ordering, run against the in-memory SQLite store.

mod helpers;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use churn_agent::models::{FeedbackCommand, SentimentLabel};
use churn_agent::services::{FeedbackValidator, PipelineError, ValidationError};
use churn_agent::storage::{FeedbackStore, StorageError};
use helpers::{memory_store, orchestrator, FailAt, FailingStore, FakeInference};

fn command(rating: Option<i64>, text: &str) -> FeedbackCommand {
    FeedbackCommand {
        rating,
        feedback_text: text.to_string(),
    }
}

async fn feedback_count(store: &churn_agent::storage::SqliteStore) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM customer_feedback")
        .fetch_one(store.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_invalid_rating_has_no_side_effects() {
    let inference = Arc::new(FakeInference::answering("POSITIVE", &[]));
    let store = Arc::new(memory_store().await);
    let pipeline = orchestrator(inference.clone(), store.clone(), FeedbackValidator::lenient());

    for (rating, expected) in [
        (None, ValidationError::MissingRating),
        (Some(11), ValidationError::RatingOutOfRange(11)),
        (Some(-1), ValidationError::RatingOutOfRange(-1)),
    ] {
        let err = pipeline.process(command(rating, "fine")).await.unwrap_err();
        match err {
            PipelineError::Validation(e) => assert_eq!(e, expected),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    assert_eq!(inference.total_calls(), 0);
    assert_eq!(feedback_count(&store).await, 0);
}

#[tokio::test]
async fn test_strict_mode_rejects_empty_text() {
    let inference = Arc::new(FakeInference::answering("POSITIVE", &[]));
    let store = Arc::new(memory_store().await);
    let pipeline = orchestrator(inference.clone(), store.clone(), FeedbackValidator::strict());

    let err = pipeline.process(command(Some(5), "   ")).await.unwrap_err();
    assert!(matches!(err, PipelineError::Validation(ValidationError::EmptyFeedback)));
    assert_eq!(inference.total_calls(), 0);
    assert_eq!(feedback_count(&store).await, 0);
}

#[tokio::test]
async fn test_low_rating_with_keyword_is_high_risk() {
    let inference = Arc::new(FakeInference::answering("NEGATIVE", &[("service", 0.95), ("pricing", 0.3)]));
    let store = Arc::new(memory_store().await);
    let pipeline = orchestrator(inference, store.clone(), FeedbackValidator::lenient());

    let outcome = pipeline
        .process(command(Some(2), "Terrible service, unhappy"))
        .await
        .unwrap();

    assert_eq!(outcome.prediction.probability, 0.8);
    assert_eq!(outcome.prediction.reason, "Low NLS score and/or negative feedback/sentiment.");
    assert_eq!(outcome.feedback.sentiment, SentimentLabel::Negative);
    assert_eq!(outcome.feedback.topics.iter().collect::<Vec<_>>(), vec!["service"]);
    assert!(!outcome.sentiment_degraded);
    assert!(!outcome.topics_degraded);
}

#[tokio::test]
async fn test_prediction_links_to_stored_feedback() {
    let inference = Arc::new(FakeInference::answering("POSITIVE", &[("ease of use", 0.9)]));
    let store = Arc::new(memory_store().await);
    let pipeline = orchestrator(inference, store.clone(), FeedbackValidator::lenient());

    let outcome = pipeline
        .process(command(Some(9), "Excellent product, very happy!"))
        .await
        .unwrap();

    assert_eq!(outcome.prediction.feedback_id, outcome.feedback.id);
    assert_eq!(outcome.prediction.probability, 0.1);

    let stored = store.fetch_feedback(&outcome.feedback.id).await.unwrap().unwrap();
    assert_eq!(stored.rating, 9);
    assert_eq!(stored.sentiment, SentimentLabel::Positive);

    let prediction = store.fetch_prediction_for(&outcome.feedback.id).await.unwrap().unwrap();
    assert_eq!(prediction.id, outcome.prediction.id);
    assert_eq!(prediction.reason, "High NLS score.");
}

#[tokio::test]
async fn test_inference_outage_still_persists() {
    let inference = Arc::new(FakeInference::unreachable());
    let store = Arc::new(memory_store().await);
    let pipeline = orchestrator(inference.clone(), store.clone(), FeedbackValidator::lenient());

    let outcome = pipeline.process(command(Some(6), "It is okay")).await.unwrap();

    assert!(outcome.sentiment_degraded);
    assert!(outcome.topics_degraded);
    assert_eq!(outcome.feedback.sentiment, SentimentLabel::Unknown);
    assert!(outcome.feedback.topics.is_empty());
    assert_eq!(outcome.prediction.probability, 0.4);
    assert_eq!(inference.total_calls(), 2);
    assert_eq!(feedback_count(&store).await, 1);
}

#[tokio::test]
async fn test_empty_text_skips_inference_and_scores_on_rating() {
    let inference = Arc::new(FakeInference::answering("NEGATIVE", &[("pricing", 0.99)]));
    let store = Arc::new(memory_store().await);
    let pipeline = orchestrator(inference.clone(), store.clone(), FeedbackValidator::lenient());

    let outcome = pipeline.process(command(Some(1), "")).await.unwrap();

    assert_eq!(inference.total_calls(), 0);
    assert_eq!(outcome.feedback.sentiment, SentimentLabel::Neutral);
    assert!(outcome.feedback.topics.is_empty());
    assert!(!outcome.sentiment_degraded);
    // No keyword and no NEGATIVE sentiment, so rating 1 lands in the moderate bucket
    assert_eq!(outcome.prediction.probability, 0.4);
}

#[tokio::test]
async fn test_negative_sentiment_without_keyword() {
    let inference = Arc::new(FakeInference::answering("negative", &[]));
    let store = Arc::new(memory_store().await);
    let pipeline = orchestrator(inference, store, FeedbackValidator::lenient());

    let outcome = pipeline
        .process(command(Some(2), "Not what I expected at all"))
        .await
        .unwrap();
    assert_eq!(outcome.prediction.probability, 0.8);

    let outcome = pipeline
        .process(command(Some(3), "Not what I expected at all"))
        .await
        .unwrap();
    assert_eq!(outcome.prediction.probability, 0.4);
}

#[tokio::test]
async fn test_feedback_write_failure_skips_prediction() {
    let inference = Arc::new(FakeInference::answering("POSITIVE", &[]));
    let store = Arc::new(FailingStore::new(FailAt::Feedback));
    let pipeline = orchestrator(inference, store.clone(), FeedbackValidator::lenient());

    let err = pipeline.process(command(Some(5), "meh")).await.unwrap_err();

    assert!(matches!(err, PipelineError::Storage(StorageError::Feedback(_))));
    assert_eq!(store.feedback_writes.load(Ordering::SeqCst), 1);
    assert_eq!(store.prediction_writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_prediction_write_failure_reports_parent_id() {
    let inference = Arc::new(FakeInference::answering("POSITIVE", &[]));
    let store = Arc::new(FailingStore::new(FailAt::Prediction));
    let pipeline = orchestrator(inference, store.clone(), FeedbackValidator::lenient());

    let err = pipeline.process(command(Some(5), "meh")).await.unwrap_err();

    match err {
        PipelineError::Storage(StorageError::Prediction { feedback_id, .. }) => {
            assert_eq!(feedback_id.as_str(), "fb-1");
        }
        other => panic!("expected prediction error, got {:?}", other),
    }
    assert_eq!(store.prediction_writes.load(Ordering::SeqCst), 1);
    assert_eq!(store.backend(), "failing");
}
