//! Pipeline services
//!
//! - `validator`: request validation
//! - `inference_client`: remote text classification
//! - `enrichment`: degrade-on-failure sentiment and topic extraction
//! - `scoring`: rule-based churn risk
//! - `orchestrator`: runs the pipeline end to end

pub mod enrichment;
pub mod inference_client;
pub mod orchestrator;
pub mod scoring;
pub mod validator;

pub use enrichment::{Enrichment, EnrichmentError, FeedbackEnricher, FeedbackInsights, SentimentAnalyzer, TopicExtractor};
pub use inference_client::{HuggingFaceClient, InferenceError, LabelScore, TextInference, ZeroShotOutput};
pub use orchestrator::{FeedbackOrchestrator, PipelineError, PredictionOutcome};
pub use scoring::score_churn;
pub use validator::{FeedbackValidator, ValidationError};
