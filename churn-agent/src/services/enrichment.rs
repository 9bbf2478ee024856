//! Feedback enrichment: sentiment and topics
//!
//! Enrichment never fails a request. Each sub-operation yields an
//! [`Enrichment`] outcome: the inferred value, a value produced without a
//! remote call, or a safe default together with the cause of the failure.

use crate::models::SentimentLabel;
use crate::services::inference_client::{InferenceError, TextInference};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Why an enrichment sub-operation fell back to its default
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("inference call failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("classifier returned no labels")]
    EmptyResult,

    #[error("malformed classifier response: {0}")]
    Malformed(String),
}

/// Tagged outcome of one enrichment sub-operation
#[derive(Debug)]
pub enum Enrichment<T> {
    /// Produced by the inference service
    Inferred(T),
    /// Produced locally; no remote call was needed
    Skipped(T),
    /// The call failed and `value` is the safe default
    Degraded { value: T, cause: EnrichmentError },
}

impl<T> Enrichment<T> {
    pub fn value(&self) -> &T {
        match self {
            Enrichment::Inferred(value) | Enrichment::Skipped(value) => value,
            Enrichment::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Enrichment::Inferred(value) | Enrichment::Skipped(value) => value,
            Enrichment::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Enrichment::Degraded { .. })
    }

    pub fn cause(&self) -> Option<&EnrichmentError> {
        match self {
            Enrichment::Degraded { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Derives a sentiment label from feedback text
#[derive(Clone)]
pub struct SentimentAnalyzer {
    inference: Arc<dyn TextInference>,
}

impl SentimentAnalyzer {
    pub fn new(inference: Arc<dyn TextInference>) -> Self {
        Self { inference }
    }

    /// Blank text → `NEUTRAL` without a remote call; failures → `UNKNOWN`
    pub async fn analyze(&self, feedback_text: &str) -> Enrichment<SentimentLabel> {
        if feedback_text.trim().is_empty() {
            return Enrichment::Skipped(SentimentLabel::Neutral);
        }

        let result = match self.inference.classify_sentiment(feedback_text).await {
            Ok(scores) if scores.is_empty() => Err(EnrichmentError::EmptyResult),
            Ok(scores) => Ok(SentimentLabel::from_model_label(best_label(
                scores.iter().map(|s| (s.label.as_str(), s.score)),
            ))),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(label) => {
                debug!(sentiment = %label, "Sentiment inferred");
                Enrichment::Inferred(label)
            }
            Err(cause) => {
                warn!("Could not get sentiment, using UNKNOWN: {}", cause);
                Enrichment::Degraded {
                    value: SentimentLabel::Unknown,
                    cause,
                }
            }
        }
    }
}

/// Label with the strictly highest score above zero; ties keep the first one
/// seen. `NEUTRAL` when no score is above zero.
fn best_label<'a>(scores: impl Iterator<Item = (&'a str, f64)>) -> &'a str {
    let mut best = ("NEUTRAL", 0.0);
    for (label, score) in scores {
        if score > best.1 {
            best = (label, score);
        }
    }
    best.0
}

/// Extracts topics by zero-shot classification against fixed candidates
#[derive(Clone)]
pub struct TopicExtractor {
    inference: Arc<dyn TextInference>,
    candidate_topics: Vec<String>,
    threshold: f64,
}

impl TopicExtractor {
    pub fn new(inference: Arc<dyn TextInference>, candidate_topics: Vec<String>, threshold: f64) -> Self {
        Self {
            inference,
            candidate_topics,
            threshold,
        }
    }

    pub fn candidate_topics(&self) -> &[String] {
        &self.candidate_topics
    }

    /// Blank text or no candidates → empty set without a remote call;
    /// failures → empty set
    pub async fn extract(&self, feedback_text: &str) -> Enrichment<BTreeSet<String>> {
        if feedback_text.trim().is_empty() || self.candidate_topics.is_empty() {
            return Enrichment::Skipped(BTreeSet::new());
        }

        let result = self
            .inference
            .classify_zero_shot(feedback_text, &self.candidate_topics)
            .await
            .map_err(EnrichmentError::from)
            .and_then(|output| {
                let pairs = output.pairs().ok_or_else(|| {
                    EnrichmentError::Malformed(format!(
                        "{} labels but {} scores",
                        output.labels.len(),
                        output.scores.len()
                    ))
                })?;
                Ok(pairs
                    .filter(|(label, score)| {
                        *score > self.threshold && self.candidate_topics.iter().any(|c| c == label)
                    })
                    .map(|(label, _)| label.to_string())
                    .collect::<BTreeSet<String>>())
            });

        match result {
            Ok(topics) => {
                debug!(topics = ?topics, "Topics inferred");
                Enrichment::Inferred(topics)
            }
            Err(cause) => {
                warn!("Could not get topics, using empty set: {}", cause);
                Enrichment::Degraded {
                    value: BTreeSet::new(),
                    cause,
                }
            }
        }
    }
}

/// Both enrichment outcomes for one feedback text
#[derive(Debug)]
pub struct FeedbackInsights {
    pub sentiment: Enrichment<SentimentLabel>,
    pub topics: Enrichment<BTreeSet<String>>,
}

/// Runs sentiment analysis and topic extraction concurrently
#[derive(Clone)]
pub struct FeedbackEnricher {
    sentiment: SentimentAnalyzer,
    topics: TopicExtractor,
}

impl FeedbackEnricher {
    pub fn new(sentiment: SentimentAnalyzer, topics: TopicExtractor) -> Self {
        Self { sentiment, topics }
    }

    /// Build both sub-operations over one inference client
    pub fn from_inference(
        inference: Arc<dyn TextInference>,
        candidate_topics: Vec<String>,
        threshold: f64,
    ) -> Self {
        Self::new(
            SentimentAnalyzer::new(inference.clone()),
            TopicExtractor::new(inference, candidate_topics, threshold),
        )
    }

    /// Both sub-operations complete (inferred, skipped or degraded) before
    /// this returns
    pub async fn enrich(&self, feedback_text: &str) -> FeedbackInsights {
        let (sentiment, topics) = tokio::join!(
            self.sentiment.analyze(feedback_text),
            self.topics.extract(feedback_text),
        );
        FeedbackInsights { sentiment, topics }
    }
}
