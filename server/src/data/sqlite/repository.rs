//! `MetricStore` implementation for SQLite
//!
//! Counter saves seed the row first, so the transaction takes the write lock
//! before it reads; concurrent saves of the same id then serialize on it.

use std::time::Duration;

use async_trait::async_trait;
use osmetrics::model::{Metric, MetricValue, aggregate};
use sqlx::SqliteConnection;

use super::{BACKEND, SqliteStore};
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

async fn save_in_tx(conn: &mut SqliteConnection, metric: &Metric) -> Result<Metric, DataError> {
    match metric.value() {
        MetricValue::Gauge(value) => {
            sqlx::query(
                "INSERT INTO metrics (id, type, delta, value) VALUES (?, 'gauge', NULL, ?)
                 ON CONFLICT(id) DO UPDATE SET type = 'gauge', delta = NULL, value = excluded.value",
            )
            .bind(metric.id())
            .bind(value)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
            Ok(metric.clone())
        }
        MetricValue::Counter(_) => {
            sqlx::query(
                "INSERT INTO metrics (id, type, delta, value) VALUES (?, 'counter', 0, NULL)
                 ON CONFLICT(id) DO NOTHING",
            )
            .bind(metric.id())
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;

            let row: MetricRow =
                sqlx::query_as("SELECT id, type, delta, value FROM metrics WHERE id = ?")
                    .bind(metric.id())
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(db_err)?;
            let current = row_to_metric(row)?;
            let next = aggregate(Some(&current), metric)?;

            sqlx::query(
                "INSERT INTO metrics (id, type, delta, value) VALUES (?, 'counter', ?, NULL)
                 ON CONFLICT(id) DO UPDATE SET type = 'counter', delta = excluded.delta, value = NULL",
            )
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
impl MetricStore for SqliteStore {
    async fn get_metric(&self, id: &str) -> Result<Option<Metric>, DataError> {
        let row: Option<MetricRow> =
            sqlx::query_as("SELECT id, type, delta, value FROM metrics WHERE id = ?")
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
        // Dropping the transaction on error rolls everything back
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
        tracing::debug!("SQLite pool closed");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DatabaseConfig;
    use std::sync::Arc;

    async fn open_store(dir: &tempfile::TempDir) -> SqliteStore {
        let config = DatabaseConfig {
            dsn: format!("sqlite://{}", dir.path().join("metrics.db").display()),
            retry_attempts: 1,
            retry_delay: Duration::from_millis(10),
        };
        SqliteStore::connect(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_gauge_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        store.save_metric(Metric::gauge("Alloc", 10.0).unwrap()).await.unwrap();
        store.save_metric(Metric::gauge("Alloc", 20.0).unwrap()).await.unwrap();

        let got = store.get_metric("Alloc").await.unwrap().unwrap();
        assert_eq!(got.gauge_value(), Some(20.0));
        assert!(store.get_metric("Missing").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_counter_saves_sum() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(open_store(&dir).await);

        let mut handles = Vec::new();
        for i in 0..200 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    store
                        .save_metric(Metric::counter("PollCount", 1).unwrap())
                        .await
                        .unwrap();
                } else {
                    store
                        .save_all_metrics(vec![
                            Metric::gauge("Load", i as f64).unwrap(),
                            Metric::counter("PollCount", 1).unwrap(),
                        ])
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let got = store.get_metric("PollCount").await.unwrap().unwrap();
        assert_eq!(got.counter_delta(), Some(200));
    }

    #[tokio::test]
    async fn test_batch_rolls_back_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store.save_metric(Metric::counter("Big", 1).unwrap()).await.unwrap();

        let err = store
            .save_all_metrics(vec![
                Metric::gauge("A", 1.0).unwrap(),
                Metric::counter("Big", i64::MAX).unwrap(),
            ])
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(store.get_metric("A").await.unwrap().is_none());
        let big = store.get_metric("Big").await.unwrap().unwrap();
        assert_eq!(big.counter_delta(), Some(1));
    }

    #[tokio::test]
    async fn test_batch_and_known_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        let stored = store
            .save_all_metrics(vec![
                Metric::counter("Hits", 2).unwrap(),
                Metric::gauge("Load", 0.5).unwrap(),
                Metric::counter("Hits", 3).unwrap(),
            ])
            .await
            .unwrap();
        assert_eq!(stored[2].counter_delta(), Some(5));
        assert_eq!(
            store.known_metrics().await.unwrap(),
            vec!["Hits".to_string(), "Load".to_string()]
        );
    }

    #[tokio::test]
    async fn test_kind_change_replaces_series() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        store.save_metric(Metric::gauge("X", 2.5).unwrap()).await.unwrap();
        let stored = store.save_metric(Metric::counter("X", 4).unwrap()).await.unwrap();
        assert_eq!(stored.counter_delta(), Some(4));

        let got = store.get_metric("X").await.unwrap().unwrap();
        assert_eq!(got.counter_delta(), Some(4));
    }

    #[tokio::test]
    async fn test_reopen_keeps_data_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store.save_metric(Metric::counter("Hits", 9).unwrap()).await.unwrap();
        store.close().await.unwrap();

        let reopened = open_store(&dir).await;
        let got = reopened.get_metric("Hits").await.unwrap().unwrap();
        assert_eq!(got.counter_delta(), Some(9));
        reopened.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_dsn_is_config_error() {
        let config = DatabaseConfig {
            dsn: "sqlite:///tmp/osmetrics-test.db?mode=bogus".to_string(),
            retry_attempts: 1,
            retry_delay: Duration::from_millis(10),
        };
        assert!(matches!(
            SqliteStore::connect(&config).await,
            Err(DataError::Config(_))
        ));
    }
}
