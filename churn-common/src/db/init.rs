//! Database initialization
//!
//! Opens (creating if needed) the SQLite database and runs the idempotent
//! schema setup. Foreign keys are enabled per connection so the
//! `churn_predictions → customer_feedback` cascade holds on every pooled
//! connection, not only the first one.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_tables(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema.
///
/// Every `:memory:` connection is a separate database, so the pool is capped
/// at one connection.
pub async fn init_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    create_tables(&pool).await?;
    Ok(pool)
}

async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_customer_feedback_table(pool).await?;
    create_churn_predictions_table(pool).await?;
    info!("Database tables initialized (customer_feedback, churn_predictions)");
    Ok(())
}

/// Create the customer_feedback table
///
/// The store assigns `id` and `created_at`; inserts read them back with
/// `RETURNING`. `comment_topics` holds a JSON array of topic labels.
pub async fn create_customer_feedback_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS customer_feedback (
            id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
            nls_score INTEGER NOT NULL CHECK (nls_score BETWEEN 0 AND 10),
            feedback_text TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            comment_sentiment TEXT NOT NULL,
            comment_topics TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the churn_predictions table
///
/// At most one prediction per feedback row; deleting the feedback row
/// deletes its prediction.
pub async fn create_churn_predictions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS churn_predictions (
            id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
            customer_feedback_id TEXT NOT NULL UNIQUE
                REFERENCES customer_feedback(id) ON DELETE CASCADE,
            churn_probability REAL NOT NULL,
            reason TEXT NOT NULL,
            predicted_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_churn_predictions_predicted_at ON churn_predictions(predicted_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
