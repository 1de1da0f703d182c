//! File-persistent store
//!
//! Wraps a [`MemoryStore`] and persists its full state as one JSON object
//! (`{ "<id>": <metric>, ... }`).
//!
//! - Store interval 0: every save is flushed before it returns.
//! - Store interval > 0: a background task flushes on that period and
//!   [`MetricStore::close`] flushes one last time.
//!
//! Snapshots are written to a sibling temp file and renamed into place.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use osmetrics::model::Metric;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use super::error::DataError;
use super::memory::MemoryStore;
use super::traits::MetricStore;
use crate::core::config::FileConfig;
use crate::utils::file::write_atomic;

pub struct FileStore {
    memory: MemoryStore,
    path: PathBuf,
    store_interval: Duration,
    /// Serializes snapshot writes
    flush_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store, restoring the previous snapshot when enabled
    pub async fn open(config: &FileConfig) -> Result<Self, DataError> {
        let memory = if config.restore {
            match load_snapshot(&config.path).await {
                Some(metrics) => {
                    tracing::info!(
                        path = %config.path.display(),
                        count = metrics.len(),
                        "Restored metrics snapshot"
                    );
                    MemoryStore::with_snapshot(metrics)
                }
                None => MemoryStore::new(),
            }
        } else {
            MemoryStore::new()
        };

        tracing::debug!(
            path = %config.path.display(),
            store_interval_secs = config.store_interval.as_secs(),
            restore = config.restore,
            "FileStore initialized"
        );
        Ok(Self {
            memory,
            path: config.path.clone(),
            store_interval: config.store_interval,
            flush_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_write_through(&self) -> bool {
        self.store_interval.is_zero()
    }

    /// Write the current state to disk
    pub async fn flush(&self) -> Result<(), DataError> {
        let _guard = self.flush_lock.lock().await;
        let snapshot = self.memory.snapshot();
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        write_atomic(&self.path, &bytes).await?;
        tracing::trace!(count = snapshot.len(), "Snapshot flushed");
        Ok(())
    }

    /// Start the periodic flush task; `None` in write-through mode
    pub fn start_flush_task(
        self: &Arc<Self>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Option<JoinHandle<()>> {
        if self.is_write_through() {
            return None;
        }

        let store = Arc::clone(self);
        Some(tokio::spawn(async move {
            let period = store.store_interval;
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            tracing::debug!("Snapshot flush task shutting down");
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if let Err(e) = store.flush().await {
                            tracing::warn!(error = %e, "Snapshot flush failed");
                        }
                    }
                }
            }
        }))
    }

    async fn after_save(&self) -> Result<(), DataError> {
        if self.is_write_through() {
            self.flush().await?;
        }
        Ok(())
    }
}

/// Read a snapshot; any failure means a cold start
async fn load_snapshot(path: &Path) -> Option<HashMap<String, Metric>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No snapshot found, starting empty");
            return None;
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not read snapshot, starting empty");
            return None;
        }
    };

    match serde_json::from_slice::<BTreeMap<String, Metric>>(&bytes) {
        Ok(snapshot) => Some(
            snapshot
                .into_values()
                .map(|metric| (metric.id().to_string(), metric))
                .collect(),
        ),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Malformed snapshot, starting empty");
            None
        }
    }
}

#[async_trait]
impl MetricStore for FileStore {
    async fn get_metric(&self, id: &str) -> Result<Option<Metric>, DataError> {
        self.memory.get_metric(id).await
    }

    async fn known_metrics(&self) -> Result<Vec<String>, DataError> {
        self.memory.known_metrics().await
    }

    async fn save_metric(&self, metric: Metric) -> Result<Metric, DataError> {
        let stored = self.memory.save_metric(metric).await?;
        self.after_save().await?;
        Ok(stored)
    }

    async fn save_all_metrics(&self, batch: Vec<Metric>) -> Result<Vec<Metric>, DataError> {
        let stored = self.memory.save_all_metrics(batch).await?;
        self.after_save().await?;
        Ok(stored)
    }

    async fn health_check(&self) -> Result<(), DataError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), DataError> {
        self.flush().await?;
        tracing::debug!(path = %self.path.display(), "FileStore closed");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
