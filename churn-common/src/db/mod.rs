//! Database initialization shared by the churn crates
//!
//! The churn service owns two tables:
//! - `customer_feedback`: enriched feedback records
//! - `churn_predictions`: one prediction per feedback row, cascade-deleted with it

pub mod init;

pub use init::{create_churn_predictions_table, create_customer_feedback_table, init_database, init_in_memory};
