//! PostgreSQL metric store
//!
//! Selected by a `postgres://` / `postgresql://` DSN. Counter saves lock the
//! row with `SELECT ... FOR UPDATE` for the read-modify-write.

mod migrations;
mod repository;
pub mod schema;

pub use sqlx::PgPool;

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::core::config::DatabaseConfig;
use crate::core::constants::{POSTGRES_ACQUIRE_TIMEOUT_SECS, POSTGRES_MAX_CONNECTIONS};
use crate::data::error::DataError;
use crate::utils::retry::retry_fixed_async;

const BACKEND: &str = "postgres";

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect (with fixed-delay retries) and apply the schema
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DataError> {
        let url = config.dsn.as_str();
        if url.is_empty() {
            return Err(DataError::Config("PostgreSQL DSN is required".into()));
        }

        let options: PgConnectOptions = url
            .parse()
            .map_err(|e| DataError::Config(format!("Invalid PostgreSQL DSN: {}", e)))?;

        let (pool, attempts) =
            retry_fixed_async(config.retry_attempts, config.retry_delay, || {
                PgPoolOptions::new()
                    .max_connections(POSTGRES_MAX_CONNECTIONS)
                    .acquire_timeout(Duration::from_secs(POSTGRES_ACQUIRE_TIMEOUT_SECS))
                    .connect_with(options.clone())
            })
            .await
            .map_err(|(e, attempts)| DataError::connection(BACKEND, attempts, e.to_string()))?;

        migrations::run_migrations(&pool).await?;

        tracing::debug!(
            attempts,
            max_connections = POSTGRES_MAX_CONNECTIONS,
            "PostgresStore initialized"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
