//! Configuration loading for the churn prediction service
//!
//! Configuration is resolved in tiers, later tiers overriding earlier ones:
//! 1. Built-in defaults (code constants)
//! 2. TOML configuration file (explicit path, or `~/.config/churn-agent/config.toml`)
//! 3. Environment variables (`SUPABASE_URL`, `SUPABASE_KEY`, `HF_TOKEN`, `CHURN_*`)
//! 4. Command-line arguments (applied by the binary)
//!
//! A missing default TOML file is not an error; a missing explicitly requested
//! file is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default candidate topics for zero-shot topic extraction
pub const DEFAULT_CANDIDATE_TOPICS: [&str; 6] = [
    "service",
    "product quality",
    "pricing",
    "customer support",
    "speed",
    "ease of use",
];

/// Complete service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub inference: InferenceConfig,
    pub validation: ValidationConfig,
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind (default `0.0.0.0:8080`)
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Which storage backend records feedback and predictions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Embedded SQLite database file
    #[default]
    Sqlite,
    /// Remote PostgREST endpoint (Supabase REST API)
    Postgrest,
}

impl std::str::FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "postgrest" | "supabase" => Ok(StorageBackend::Postgrest),
            other => Err(Error::Config(format!(
                "Unknown storage backend '{}' (expected 'sqlite' or 'postgrest')",
                other
            ))),
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selection; `None` means "decide from the other settings"
    pub backend: Option<StorageBackend>,
    /// SQLite database file path
    pub database_path: PathBuf,
    /// PostgREST base URL (e.g. `https://project.supabase.co`)
    pub postgrest_url: Option<String>,
    /// PostgREST service key
    pub postgrest_key: Option<String>,
    /// Request timeout for PostgREST writes, in seconds
    pub request_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: None,
            database_path: default_database_path(),
            postgrest_url: None,
            postgrest_key: None,
            request_timeout_secs: 30,
        }
    }
}

impl StorageConfig {
    /// Effective backend: explicit setting wins, otherwise a configured
    /// PostgREST URL selects PostgREST, otherwise SQLite.
    pub fn effective_backend(&self) -> StorageBackend {
        match self.backend {
            Some(backend) => backend,
            None if self.postgrest_url.is_some() => StorageBackend::Postgrest,
            None => StorageBackend::Sqlite,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Text inference endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InferenceConfig {
    /// Base URL; model ids are appended as path segments
    pub base_url: String,
    /// Bearer token for the inference API
    pub api_token: Option<String>,
    /// Single-label sentiment classifier model id
    pub sentiment_model: String,
    /// Multi-label zero-shot classifier model id
    pub zero_shot_model: String,
    /// Per-call timeout, in seconds
    pub timeout_secs: u64,
    /// Topics scoring strictly above this value are retained
    pub topic_threshold: f64,
    /// Candidate labels offered to the zero-shot classifier
    pub candidate_topics: Vec<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-inference.huggingface.co/models".to_string(),
            api_token: None,
            sentiment_model: "distilbert-base-uncased-finetuned-sst-2-english".to_string(),
            zero_shot_model: "facebook/bart-large-mnli".to_string(),
            timeout_secs: 30,
            topic_threshold: 0.8,
            candidate_topics: DEFAULT_CANDIDATE_TOPICS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Request validation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ValidationConfig {
    /// Reject blank feedback text (stricter variant)
    pub require_feedback_text: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from defaults, an optional TOML file and the
    /// process environment.
    ///
    /// `explicit_path` must exist if given. Without it, the platform default
    /// config file is read when present.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match explicit_path {
            Some(path) => Self::from_toml_file(path)?,
            None => match default_config_file().filter(|p| p.exists()) {
                Some(path) => Self::from_toml_file(&path)?,
                None => {
                    debug!("No config file found, using built-in defaults");
                    Self::default()
                }
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read config {} failed: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{} ({})", e, path.display())))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Apply environment-style overrides.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map instead of
    /// mutating the process environment. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("SUPABASE_URL") {
            self.storage.postgrest_url = Some(url);
        }
        if let Some(key) = get("SUPABASE_KEY") {
            self.storage.postgrest_key = Some(key);
        }
        if let Some(backend) = get("CHURN_STORAGE_BACKEND") {
            self.storage.backend = Some(backend.parse()?);
        }
        if let Some(path) = get("CHURN_DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(path);
        }
        if let Some(token) = get("HF_TOKEN") {
            self.inference.api_token = Some(token);
        }
        if let Some(url) = get("CHURN_INFERENCE_URL") {
            self.inference.base_url = url;
        }
        if let Some(addr) = get("CHURN_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(flag) = get("CHURN_REQUIRE_FEEDBACK_TEXT") {
            self.validation.require_feedback_text = parse_bool(&flag).ok_or_else(|| {
                Error::Config(format!(
                    "CHURN_REQUIRE_FEEDBACK_TEXT must be a boolean, got '{}'",
                    flag
                ))
            })?;
        }

        Ok(())
    }

    /// Check that the configuration can construct every client.
    ///
    /// A missing inference token is only a warning: enrichment degrades
    /// per request instead of blocking startup.
    pub fn validate(&self) -> Result<()> {
        if self.storage.effective_backend() == StorageBackend::Postgrest {
            let url_ok = self.storage.postgrest_url.as_deref().is_some_and(is_present);
            let key_ok = self.storage.postgrest_key.as_deref().is_some_and(is_present);
            if !url_ok || !key_ok {
                return Err(Error::Config(
                    "SUPABASE_URL and SUPABASE_KEY must be set for the postgrest storage backend"
                        .to_string(),
                ));
            }
        }

        if self.storage.request_timeout_secs == 0 || self.inference.timeout_secs == 0 {
            return Err(Error::Config("Timeouts must be greater than zero".to_string()));
        }

        if !is_present(&self.inference.sentiment_model) || !is_present(&self.inference.zero_shot_model) {
            return Err(Error::Config("Inference model ids cannot be empty".to_string()));
        }

        if !(0.0..=1.0).contains(&self.inference.topic_threshold) {
            return Err(Error::Config(format!(
                "topic_threshold must be within [0, 1], got {}",
                self.inference.topic_threshold
            )));
        }

        if !self.inference.api_token.as_deref().is_some_and(is_present) {
            warn!("HF_TOKEN not set. Sentiment/topic enrichment will degrade on every request.");
        }

        Ok(())
    }
}

fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Platform config file: `<config_dir>/churn-agent/config.toml`
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("churn-agent").join("config.toml"))
}

/// Platform data file: `<data_local_dir>/churn-agent/churn.db`
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("churn-agent"))
        .unwrap_or_else(|| PathBuf::from("./churn_data"))
        .join("churn.db")
}
