//! SQLite schema management
//!
//! The schema has a single version; a missing or zeroed version row means the
//! initial schema is applied.

use sqlx::SqlitePool;

use super::schema::{SCHEMA, SCHEMA_VERSION};
use crate::data::error::DataError;
use crate::utils::crypto::sha256_hex;

const BACKEND: &str = "sqlite";

/// Bring the schema up to [`SCHEMA_VERSION`]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DataError> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
    )
    .fetch_one(pool)
    .await
    .map_err(DataError::from_sqlite)?;

    if !table_exists {
        tracing::debug!(
            "Initializing database with schema version {}",
            SCHEMA_VERSION
        );
        return apply_initial_schema(pool).await;
    }

    let current_version: i32 =
        sqlx::query_scalar("SELECT version FROM schema_version WHERE id = 1")
            .fetch_optional(pool)
            .await
            .map_err(DataError::from_sqlite)?
            .unwrap_or(0);

    if current_version <= 0 {
        return apply_initial_schema(pool).await;
    }
    if current_version > SCHEMA_VERSION {
        tracing::warn!(
            "SQLite schema version {} is newer than application version {}",
            current_version,
            SCHEMA_VERSION
        );
        return Ok(());
    }

    tracing::debug!("Database schema is up to date (version {})", current_version);
    Ok(())
}

async fn apply_initial_schema(pool: &SqlitePool) -> Result<(), DataError> {
    let start = std::time::Instant::now();
    let fail = |e: sqlx::Error| {
        DataError::migration_failed(BACKEND, SCHEMA_VERSION, "initial_schema", &e.to_string())
    };

    let mut tx = pool.begin().await.map_err(DataError::from_sqlite)?;

    sqlx::raw_sql(SCHEMA).execute(&mut *tx).await.map_err(fail)?;

    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "INSERT OR REPLACE INTO schema_version (id, version, applied_at, description) VALUES (1, ?, ?, 'Initial schema')",
    )
    .bind(SCHEMA_VERSION)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(fail)?;

    let elapsed_ms = start.elapsed().as_millis() as i64;
    sqlx::query(
        "INSERT OR REPLACE INTO schema_migrations (version, name, applied_at, checksum, execution_time_ms) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(SCHEMA_VERSION)
    .bind("initial_schema")
    .bind(now)
    .bind(sha256_hex(SCHEMA))
    .bind(elapsed_ms)
    .execute(&mut *tx)
    .await
    .map_err(fail)?;

    tx.commit().await.map_err(DataError::from_sqlite)?;

    tracing::debug!("Applied initial schema in {}ms", elapsed_ms);
    Ok(())
}
