//! Unified error type for the storage layer
//!
//! Wraps backend-specific errors while keeping track of which backend
//! produced them.

use osmetrics::model::MetricError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(sqlx::Error),

    /// PostgreSQL database error
    #[error("PostgreSQL error: {0}")]
    Postgres(sqlx::Error),

    /// Snapshot file I/O
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Operation exceeded its time bound
    #[error("Query timeout after {timeout_secs}s on {backend}")]
    Timeout {
        backend: &'static str,
        timeout_secs: u64,
    },

    /// Unique-constraint violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rejected by the metric model (bad stored row, counter overflow)
    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error("Migration {version} ({name}) failed on {backend}: {error}")]
    MigrationFailed {
        backend: &'static str,
        version: i32,
        name: String,
        error: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection could not be established within the retry budget
    #[error("Could not connect to {backend} after {attempts} attempts: {reason}")]
    Connection {
        backend: &'static str,
        attempts: u32,
        reason: String,
    },
}

impl DataError {
    pub fn from_sqlite(e: sqlx::Error) -> Self {
        Self::Sqlite(e)
    }

    pub fn from_postgres(e: sqlx::Error) -> Self {
        Self::Postgres(e)
    }

    pub fn migration_failed(backend: &'static str, version: i32, name: &str, error: &str) -> Self {
        Self::MigrationFailed {
            backend,
            version,
            name: name.to_string(),
            error: error.to_string(),
        }
    }

    pub fn timeout(backend: &'static str, timeout_secs: u64) -> Self {
        Self::Timeout {
            backend,
            timeout_secs,
        }
    }

    pub fn connection(backend: &'static str, attempts: u32, reason: impl Into<String>) -> Self {
        Self::Connection {
            backend,
            attempts,
            reason: reason.into(),
        }
    }

    /// Map a sqlx error, pulling unique violations out as [`DataError::Conflict`]
    pub fn classify(backend: &'static str, e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e
            && db.is_unique_violation()
        {
            return Self::Conflict(db.message().to_string());
        }
        match backend {
            "postgres" => Self::Postgres(e),
            _ => Self::Sqlite(e),
        }
    }

    /// True when the caller sent something the model rejects
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Metric(_))
    }
}
