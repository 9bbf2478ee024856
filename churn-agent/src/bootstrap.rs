//! Startup wiring: configuration to a ready [`FeedbackOrchestrator`]
//!
//! Every client is built exactly once here and handed to the orchestrator.
//! Nothing is constructed lazily on the request path.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use churn_common::config::{ServiceConfig, StorageBackend};
use tracing::{info, warn};

use crate::services::{FeedbackEnricher, FeedbackOrchestrator, FeedbackValidator, HuggingFaceClient, TextInference};
use crate::storage::{FeedbackStore, PostgrestStore, SqliteStore};

/// Validate `config` and construct the pipeline it describes
pub async fn build_orchestrator(config: &ServiceConfig) -> Result<FeedbackOrchestrator> {
    config.validate()?;

    let store = build_store(config).await?;
    info!("Storage backend: {}", store.backend());

    let client = HuggingFaceClient::new(&config.inference).context("Failed to build inference client")?;
    if !client.is_configured() {
        warn!("Inference client has no API token");
    }
    let inference: Arc<dyn TextInference> = Arc::new(client);

    let enricher = FeedbackEnricher::from_inference(
        inference,
        config.inference.candidate_topics.clone(),
        config.inference.topic_threshold,
    );
    let validator = FeedbackValidator::new(config.validation.require_feedback_text);

    Ok(FeedbackOrchestrator::new(validator, enricher, store))
}

async fn build_store(config: &ServiceConfig) -> Result<Arc<dyn FeedbackStore>> {
    let storage = &config.storage;

    match storage.effective_backend() {
        StorageBackend::Sqlite => {
            info!("Database: {}", storage.database_path.display());
            let pool = churn_common::db::init_database(&storage.database_path)
                .await
                .context("Failed to open SQLite database")?;
            Ok(Arc::new(SqliteStore::new(pool)))
        }
        StorageBackend::Postgrest => {
            let (url, key) = match (&storage.postgrest_url, &storage.postgrest_key) {
                (Some(url), Some(key)) => (url, key),
                _ => return Err(anyhow!("PostgREST URL and key are required")),
            };
            let store = PostgrestStore::new(url, key, storage.request_timeout())
                .context("Failed to build PostgREST client")?;
            Ok(Arc::new(store))
        }
    }
}
