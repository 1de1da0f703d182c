//! SQLite metric store
//!
//! Embedded relational backend selected by a `sqlite:` DSN.
//! - WAL mode so readers never block the writer
//! - Busy timeout so pooled connections wait for the write lock
//!
//! `sqlite::memory:` gives every pooled connection its own database; use a
//! file path instead.

mod migrations;
mod repository;
pub mod schema;

pub use sqlx::SqlitePool;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::core::config::DatabaseConfig;
use crate::core::constants::{SQLITE_BUSY_TIMEOUT_SECS, SQLITE_MAX_CONNECTIONS};
use crate::data::error::DataError;
use crate::utils::retry::retry_fixed_async;

const BACKEND: &str = "sqlite";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect (with fixed-delay retries) and apply the schema
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DataError> {
        let options = SqliteConnectOptions::from_str(&config.dsn)
            .map_err(|e| DataError::Config(format!("Invalid SQLite DSN: {}", e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(SQLITE_BUSY_TIMEOUT_SECS));

        let (pool, attempts) =
            retry_fixed_async(config.retry_attempts, config.retry_delay, || {
                SqlitePoolOptions::new()
                    .max_connections(SQLITE_MAX_CONNECTIONS)
                    .connect_with(options.clone())
            })
            .await
            .map_err(|(e, attempts)| DataError::connection(BACKEND, attempts, e.to_string()))?;

        migrations::run_migrations(&pool).await?;

        tracing::debug!(attempts, "SqliteStore initialized");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
