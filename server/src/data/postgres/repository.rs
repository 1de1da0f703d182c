//! `MetricStore` implementation for PostgreSQL

use std::time::Duration;

use async_trait::async_trait;
use osmetrics::model::{Metric, MetricValue, aggregate};
use sqlx::PgConnection;

use super::{BACKEND, PostgresStore};
use crate::core::constants::HEALTH_CHECK_TIMEOUT_SECS;
use crate::data::error::DataError;
use crate::data::traits::MetricStore;

type MetricRow = (String, String, Option<i64>, Option<f64>);

fn row_to_metric((id, kind, delta, value): MetricRow) -> Result<Metric, DataError> {
    Ok(Metric::from_parts(id, &kind, delta, value)?)
}

fn db_err(e: sqlx::Error) -> DataError {
    DataError::classify(BACKEND, e)
}

async fn save_in_tx(conn: &mut PgConnection, metric: &Metric) -> Result<Metric, DataError> {
    match metric.value() {
        MetricValue::Gauge(value) => {
            sqlx::query(
                "INSERT INTO metrics (id, type, delta, value) VALUES ($1, 'gauge', NULL, $2)
                 ON CONFLICT (id) DO UPDATE SET type = 'gauge', delta = NULL, value = EXCLUDED.value",
            )
            .bind(metric.id())
            .bind(value)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
            Ok(metric.clone())
        }
        MetricValue::Counter(_) => {
            // Seed the row so there is always something to lock
            sqlx::query(
                "INSERT INTO metrics (id, type, delta, value) VALUES ($1, 'counter', 0, NULL)
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(metric.id())
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;

            let row: MetricRow = sqlx::query_as(
                "SELECT id, type, delta, value FROM metrics WHERE id = $1 FOR UPDATE",
            )
            .bind(metric.id())
            .fetch_one(&mut *conn)
            .await
            .map_err(db_err)?;
            let current = row_to_metric(row)?;
            let next = aggregate(Some(&current), metric)?;

            sqlx::query("UPDATE metrics SET type = 'counter', delta = $2, value = NULL WHERE id = $1")
                .bind(next.id())
                .bind(next.counter_delta())
                .execute(&mut *conn)
                .await
                .map_err(db_err)?;
            Ok(next)
        }
    }
}

#[async_trait]
impl MetricStore for PostgresStore {
    async fn get_metric(&self, id: &str) -> Result<Option<Metric>, DataError> {
        let row: Option<MetricRow> =
            sqlx::query_as("SELECT id, type, delta, value FROM metrics WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await
                .map_err(db_err)?;
        row.map(row_to_metric).transpose()
    }

    async fn known_metrics(&self) -> Result<Vec<String>, DataError> {
        sqlx::query_scalar("SELECT id FROM metrics ORDER BY id")
            .fetch_all(self.pool())
            .await
            .map_err(db_err)
    }

    async fn save_metric(&self, metric: Metric) -> Result<Metric, DataError> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;
        let stored = save_in_tx(&mut tx, &metric).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(stored)
    }

    async fn save_all_metrics(&self, batch: Vec<Metric>) -> Result<Vec<Metric>, DataError> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;
        let mut stored = Vec::with_capacity(batch.len());
        for metric in &batch {
            stored.push(save_in_tx(&mut tx, metric).await?);
        }
        tx.commit().await.map_err(db_err)?;
        Ok(stored)
    }

    async fn health_check(&self) -> Result<(), DataError> {
        let query = sqlx::query("SELECT 1").execute(self.pool());
        tokio::time::timeout(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS), query)
            .await
            .map_err(|_| DataError::timeout(BACKEND, HEALTH_CHECK_TIMEOUT_SECS))?
            .map_err(db_err)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), DataError> {
        self.pool().close().await;
        tracing::debug!("PostgreSQL pool closed");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}
