//! In-memory store
//!
//! One read-write lock over the whole map. Saves hold the write lock for the
//! full read-aggregate-write step, so counters never lose updates.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use osmetrics::model::{Metric, aggregate};
use parking_lot::RwLock;

use super::error::DataError;
use super::traits::MetricStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    metrics: RwLock<HashMap<String, Metric>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from a restored snapshot
    pub fn with_snapshot(metrics: HashMap<String, Metric>) -> Self {
        Self {
            metrics: RwLock::new(metrics),
        }
    }

    /// Copy of the current state, ordered by id
    pub fn snapshot(&self) -> BTreeMap<String, Metric> {
        self.metrics
            .read()
            .iter()
            .map(|(id, metric)| (id.clone(), metric.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }

    fn save(&self, metric: &Metric) -> Result<Metric, DataError> {
        let mut metrics = self.metrics.write();
        let stored = aggregate(metrics.get(metric.id()), metric)?;
        metrics.insert(stored.id().to_string(), stored.clone());
        Ok(stored)
    }

    fn save_all(&self, batch: &[Metric]) -> Result<Vec<Metric>, DataError> {
        let mut metrics = self.metrics.write();

        // Stage against the live map; commit only once every entry succeeds
        let mut staged: HashMap<String, Metric> = HashMap::new();
        let mut stored = Vec::with_capacity(batch.len());
        for metric in batch {
            let current = staged
                .get(metric.id())
                .or_else(|| metrics.get(metric.id()));
            let next = aggregate(current, metric)?;
            staged.insert(next.id().to_string(), next.clone());
            stored.push(next);
        }

        metrics.extend(staged);
        Ok(stored)
    }
}

#[async_trait]
impl MetricStore for MemoryStore {
    async fn get_metric(&self, id: &str) -> Result<Option<Metric>, DataError> {
        Ok(self.metrics.read().get(id).cloned())
    }

    async fn known_metrics(&self) -> Result<Vec<String>, DataError> {
        let mut ids: Vec<String> = self.metrics.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn save_metric(&self, metric: Metric) -> Result<Metric, DataError> {
        self.save(&metric)
    }

    async fn save_all_metrics(&self, batch: Vec<Metric>) -> Result<Vec<Metric>, DataError> {
        self.save_all(&batch)
    }

    async fn health_check(&self) -> Result<(), DataError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), DataError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_gauge_last_write_wins() {
        let store = MemoryStore::new();
        store.save_metric(Metric::gauge("Alloc", 10.0).unwrap()).await.unwrap();
        let stored = store.save_metric(Metric::gauge("Alloc", 20.0).unwrap()).await.unwrap();

        assert_eq!(stored.gauge_value(), Some(20.0));
        let got = store.get_metric("Alloc").await.unwrap().unwrap();
        assert_eq!(got.gauge_value(), Some(20.0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_counter_saves_sum() {
        let store = Arc::new(MemoryStore::new());

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
    async fn test_batch_applies_in_order() {
        let store = MemoryStore::new();
        let stored = store
            .save_all_metrics(vec![
                Metric::counter("Hits", 2).unwrap(),
                Metric::gauge("Load", 0.5).unwrap(),
                Metric::counter("Hits", 3).unwrap(),
            ])
            .await
            .unwrap();

        let deltas: Vec<Option<i64>> = stored.iter().map(|m| m.counter_delta()).collect();
        assert_eq!(deltas, vec![Some(2), None, Some(5)]);
        assert_eq!(
            store.known_metrics().await.unwrap(),
            vec!["Hits".to_string(), "Load".to_string()]
        );
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let store = MemoryStore::new();
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
    async fn test_kind_change_replaces_series() {
        let store = MemoryStore::new();
        store.save_metric(Metric::counter("X", 5).unwrap()).await.unwrap();
        store.save_metric(Metric::gauge("X", 1.5).unwrap()).await.unwrap();

        let got = store.get_metric("X").await.unwrap().unwrap();
        assert_eq!(got.gauge_value(), Some(1.5));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_seeded_from_snapshot() {
        let mut seed = HashMap::new();
        seed.insert("Hits".to_string(), Metric::counter("Hits", 4).unwrap());
        let store = MemoryStore::with_snapshot(seed);

        let stored = store.save_metric(Metric::counter("Hits", 1).unwrap()).await.unwrap();
        assert_eq!(stored.counter_delta(), Some(5));
        assert!(!store.is_empty());
        assert_eq!(store.snapshot().len(), 1);
    }
}
