//! SQLite persistence for the usage ledger.
//!
//! The ledger is append-only: rows are inserted once and never updated
//! except for the quota-state flip performed by a daily reset. Quota
//! checks and analytics are aggregate queries over the same table, so
//! accounting and enforcement can never disagree about what happened.

pub mod error;
mod usage;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

pub use error::{DbError, DbResult};
pub use usage::{SqliteUsageRepo, UsageRepo};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS usage_records (
    id             TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL,
    provider       TEXT NOT NULL,
    model          TEXT NOT NULL,
    feature        TEXT NOT NULL,
    input_tokens   INTEGER NOT NULL DEFAULT 0,
    output_tokens  INTEGER NOT NULL DEFAULT 0,
    total_tokens   INTEGER NOT NULL DEFAULT 0,
    cost_microcents INTEGER NOT NULL DEFAULT 0,
    cost_display   TEXT NOT NULL DEFAULT '0',
    cost_currency  TEXT NOT NULL DEFAULT 'inr',
    latency_ms     INTEGER NOT NULL DEFAULT 0,
    outcome        TEXT NOT NULL,
    error_message  TEXT,
    quota_state    TEXT NOT NULL DEFAULT 'counted',
    metadata       TEXT NOT NULL DEFAULT '{}',
    created_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_usage_user_created
    ON usage_records (user_id, created_at);

CREATE INDEX IF NOT EXISTS idx_usage_quota_window
    ON usage_records (user_id, outcome, quota_state, created_at);
"#;

/// Handle to the SQLite pool plus schema management.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if necessary) the database file at `path`.
    pub async fn connect(path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// In-memory database for tests.
    pub async fn in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // A single connection so every query sees the same memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Apply the schema. Idempotent.
    pub async fn migrate(&self) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn usage_repo(&self) -> SqliteUsageRepo {
        SqliteUsageRepo::new(self.pool.clone())
    }
}
