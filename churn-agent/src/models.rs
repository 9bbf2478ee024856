//! Domain types for the churn prediction pipeline
//!
//! Feedback flows through the pipeline as:
//! `FeedbackCommand` → `ValidatedFeedback` → `NewFeedback` → `FeedbackRecord`
//! and the score as `ChurnRisk` → `NewPrediction` → `ChurnPrediction`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Raw inbound command, as decoded from the request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackCommand {
    /// NLS score; `None` when absent or `null`
    #[serde(default, alias = "nls_score")]
    pub rating: Option<i64>,
    /// Free-text feedback; absent or `null` reads as empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub feedback_text: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Command that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFeedback {
    /// Rating in 0..=10
    pub rating: u8,
    pub feedback_text: String,
}

/// Sentiment label produced by enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    /// Enrichment failed; the label could not be determined
    Unknown,
    /// Any other label the classifier emits
    Other(String),
}

impl SentimentLabel {
    /// Parse a model label case-insensitively; unrecognized labels are
    /// kept exactly as the model returned them
    pub fn from_model_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" => SentimentLabel::Positive,
            "NEGATIVE" => SentimentLabel::Negative,
            "NEUTRAL" => SentimentLabel::Neutral,
            "UNKNOWN" => SentimentLabel::Unknown,
            _ => SentimentLabel::Other(label.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SentimentLabel::Positive => "POSITIVE",
            SentimentLabel::Negative => "NEGATIVE",
            SentimentLabel::Neutral => "NEUTRAL",
            SentimentLabel::Unknown => "UNKNOWN",
            SentimentLabel::Other(label) => label,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Churn risk bucket
///
/// Each bucket carries a fixed probability and reason, so a prediction can
/// only ever hold one of three probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChurnRisk {
    High,
    Moderate,
    Low,
}

impl ChurnRisk {
    pub const ALL: [ChurnRisk; 3] = [ChurnRisk::High, ChurnRisk::Moderate, ChurnRisk::Low];

    pub fn probability(self) -> f64 {
        match self {
            ChurnRisk::High => 0.8,
            ChurnRisk::Moderate => 0.4,
            ChurnRisk::Low => 0.1,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            ChurnRisk::High => "Low NLS score and/or negative feedback/sentiment.",
            ChurnRisk::Moderate => "Moderate NLS score or neutral feedback/sentiment.",
            ChurnRisk::Low => "High NLS score.",
        }
    }
}

/// Store-assigned record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        RecordId(value)
    }
}

/// Enriched feedback ready to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub rating: u8,
    pub feedback_text: String,
    pub sentiment: SentimentLabel,
    pub topics: BTreeSet<String>,
}

/// Persisted feedback record
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    pub id: RecordId,
    pub rating: u8,
    pub feedback_text: String,
    pub created_at: DateTime<Utc>,
    pub sentiment: SentimentLabel,
    pub topics: BTreeSet<String>,
}

/// Prediction insert, linked to an already persisted feedback record
#[derive(Debug, Clone, PartialEq)]
pub struct NewPrediction {
    feedback_id: RecordId,
    risk: ChurnRisk,
    predicted_at: DateTime<Utc>,
}

impl NewPrediction {
    /// The only constructor: the parent must already carry a store-assigned id
    pub fn for_feedback(feedback: &FeedbackRecord, risk: ChurnRisk) -> Self {
        Self {
            feedback_id: feedback.id.clone(),
            risk,
            predicted_at: Utc::now(),
        }
    }

    pub fn feedback_id(&self) -> &RecordId {
        &self.feedback_id
    }

    pub fn risk(&self) -> ChurnRisk {
        self.risk
    }

    pub fn probability(&self) -> f64 {
        self.risk.probability()
    }

    pub fn reason(&self) -> &'static str {
        self.risk.reason()
    }

    pub fn predicted_at(&self) -> DateTime<Utc> {
        self.predicted_at
    }
}

/// Persisted churn prediction
#[derive(Debug, Clone, PartialEq)]
pub struct ChurnPrediction {
    pub id: RecordId,
    pub feedback_id: RecordId,
    pub probability: f64,
    pub reason: String,
    pub predicted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_label_parsing_is_case_insensitive() {
        assert_eq!(SentimentLabel::from_model_label("negative"), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_model_label("Positive"), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::Other("LABEL_1".to_string()).to_string(), "LABEL_1");
    }

    #[test]
    fn test_unrecognized_label_kept_verbatim() {
        assert_eq!(
            SentimentLabel::from_model_label("label_1"),
            SentimentLabel::Other("label_1".to_string())
        );
        assert_eq!(SentimentLabel::from_model_label("Mixed ").as_str(), "Mixed ");
    }

    #[test]
    fn test_null_feedback_text_reads_as_empty() {
        let command: FeedbackCommand =
            serde_json::from_str(r#"{"rating": 5, "feedback_text": null}"#).unwrap();
        assert_eq!(command.rating, Some(5));
        assert_eq!(command.feedback_text, "");

        let command: FeedbackCommand = serde_json::from_str(r#"{"nls_score": 3}"#).unwrap();
        assert_eq!(command.rating, Some(3));
        assert_eq!(command.feedback_text, "");
    }

    #[test]
    fn test_command_accepts_nls_score_alias() {
        let cmd: FeedbackCommand =
            serde_json::from_str(r#"{"nls_score": 7, "feedback_text": "ok"}"#).unwrap();
        assert_eq!(cmd.rating, Some(7));

        let cmd: FeedbackCommand = serde_json::from_str(r#"{"rating": null}"#).unwrap();
        assert_eq!(cmd.rating, None);
        assert_eq!(cmd.feedback_text, "");
    }

    #[test]
    fn test_new_prediction_links_parent_id() {
        let feedback = FeedbackRecord {
            id: RecordId("fb-42".to_string()),
            rating: 3,
            feedback_text: String::new(),
            created_at: Utc::now(),
            sentiment: SentimentLabel::Neutral,
            topics: BTreeSet::new(),
        };

        let prediction = NewPrediction::for_feedback(&feedback, ChurnRisk::Moderate);
        assert_eq!(prediction.feedback_id(), &feedback.id);
        assert_eq!(prediction.probability(), 0.4);
    }
}
