//! # churn-common
//!
//! Shared code for the churn prediction service:
//! - Error type shared across crates
//! - Layered configuration loading (defaults → TOML → environment)
//! - SQLite pool construction and schema initialization

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;

pub use config::ServiceConfig;
pub use error::{Error, Result};
