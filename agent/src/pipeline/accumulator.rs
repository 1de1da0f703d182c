//! Batch accumulator for `batch` delivery mode

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::model::{Metric, MetricError, aggregate};

/// Folds received metrics until the reporter drains them
///
/// Gauges keep the latest value, counters sum their deltas.
#[derive(Debug, Default)]
pub struct MetricAccumulator {
    pending: Mutex<HashMap<String, Metric>>,
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one metric into the pending set
    ///
    /// On error the pending entry for that id is left unchanged.
    pub fn record(&self, metric: Metric) -> Result<(), MetricError> {
        let mut pending = self.pending.lock();
        let folded = aggregate(pending.get(metric.id()), &metric)?;
        pending.insert(folded.id().to_string(), folded);
        Ok(())
    }

    /// Take everything pending, sorted by id
    pub fn drain(&self) -> Vec<Metric> {
        let taken = std::mem::take(&mut *self.pending.lock());
        let mut batch: Vec<Metric> = taken.into_values().collect();
        batch.sort_by(|a, b| a.id().cmp(b.id()));
        batch
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauges_keep_latest() {
        let acc = MetricAccumulator::new();
        acc.record(Metric::gauge("Alloc", 1.0).unwrap()).unwrap();
        acc.record(Metric::gauge("Alloc", 2.5).unwrap()).unwrap();

        let batch = acc.drain();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].gauge_value(), Some(2.5));
    }

    #[test]
    fn test_counters_sum() {
        let acc = MetricAccumulator::new();
        for _ in 0..3 {
            acc.record(Metric::counter("PollCount", 1).unwrap()).unwrap();
        }
        acc.record(Metric::counter("PollCount", 4).unwrap()).unwrap();

        let batch = acc.drain();
        assert_eq!(batch[0].counter_delta(), Some(7));
    }

    #[test]
    fn test_drain_empties_and_sorts() {
        let acc = MetricAccumulator::new();
        acc.record(Metric::gauge("b", 1.0).unwrap()).unwrap();
        acc.record(Metric::counter("a", 1).unwrap()).unwrap();
        assert_eq!(acc.len(), 2);

        let ids: Vec<String> = acc.drain().iter().map(|m| m.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(acc.is_empty());
        assert!(acc.drain().is_empty());
    }

    #[test]
    fn test_overflow_keeps_previous_sum() {
        let acc = MetricAccumulator::new();
        acc.record(Metric::counter("Big", i64::MAX).unwrap()).unwrap();

        let err = acc.record(Metric::counter("Big", 1).unwrap()).unwrap_err();
        assert!(matches!(err, MetricError::CounterOverflow { .. }));
        assert_eq!(acc.drain()[0].counter_delta(), Some(i64::MAX));
    }
}
