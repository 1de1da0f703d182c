//! PostgreSQL migration management

use sqlx::PgPool;

use super::schema::{SCHEMA, SCHEMA_VERSION};
use crate::data::error::DataError;
use crate::utils::crypto::sha256_hex;

const BACKEND: &str = "postgres";

/// Run all pending migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), DataError> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_name = 'schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .map_err(DataError::from_postgres)?;

    if !table_exists {
        tracing::debug!("Applying initial PostgreSQL schema v{}", SCHEMA_VERSION);
        return apply_initial_schema(pool).await;
    }

    let current_version: i32 =
        sqlx::query_scalar("SELECT version FROM schema_version WHERE id = 1")
            .fetch_optional(pool)
            .await
            .map_err(DataError::from_postgres)?
            .unwrap_or(0);

    if current_version <= 0 {
        tracing::debug!("Applying initial PostgreSQL schema v{}", SCHEMA_VERSION);
        return apply_initial_schema(pool).await;
    }
    if current_version > SCHEMA_VERSION {
        tracing::warn!(
            "PostgreSQL schema version {} is newer than application version {}",
            current_version,
            SCHEMA_VERSION
        );
        return Ok(());
    }

    tracing::debug!("PostgreSQL schema is up to date (v{})", current_version);
    Ok(())
}

async fn apply_initial_schema(pool: &PgPool) -> Result<(), DataError> {
    let start = std::time::Instant::now();
    let fail = |e: sqlx::Error| {
        DataError::migration_failed(BACKEND, SCHEMA_VERSION, "initial_schema", &e.to_string())
    };

    let mut tx = pool.begin().await.map_err(DataError::from_postgres)?;

    // Multi-statement script needs the simple query protocol
    sqlx::raw_sql(SCHEMA).execute(&mut *tx).await.map_err(fail)?;

    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO schema_version (id, version, applied_at, description)
        VALUES (1, $1, $2, 'Initial schema')
        ON CONFLICT (id) DO UPDATE SET version = EXCLUDED.version, applied_at = EXCLUDED.applied_at
        "#,
    )
    .bind(SCHEMA_VERSION)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(fail)?;

    let elapsed_ms = start.elapsed().as_millis() as i64;
    sqlx::query(
        r#"
        INSERT INTO schema_migrations (version, name, applied_at, checksum, execution_time_ms)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (version) DO NOTHING
        "#,
    )
    .bind(SCHEMA_VERSION)
    .bind("initial_schema")
    .bind(now)
    .bind(sha256_hex(SCHEMA))
    .bind(elapsed_ms)
    .execute(&mut *tx)
    .await
    .map_err(fail)?;

    tx.commit().await.map_err(DataError::from_postgres)?;

    tracing::debug!("Applied initial PostgreSQL schema in {}ms", elapsed_ms);
    Ok(())
}
