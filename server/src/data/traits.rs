//! Storage trait shared by every backend

use async_trait::async_trait;
use osmetrics::model::Metric;

use crate::data::error::DataError;

/// Series store keyed by metric id
///
/// Every backend applies the same save step ([`osmetrics::model::aggregate`]):
/// gauges overwrite, counters add their delta to the stored sum. Counter
/// read-modify-write is serialized per id so concurrent saves never lose an
/// update.
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Stored series for `id`, if any
    async fn get_metric(&self, id: &str) -> Result<Option<Metric>, DataError>;

    /// Every stored id, sorted
    async fn known_metrics(&self) -> Result<Vec<String>, DataError>;

    /// Apply one save and return the stored series
    async fn save_metric(&self, metric: Metric) -> Result<Metric, DataError>;

    /// Apply saves in order as one unit; nothing is stored if any entry fails
    async fn save_all_metrics(&self, batch: Vec<Metric>) -> Result<Vec<Metric>, DataError>;

    async fn health_check(&self) -> Result<(), DataError>;

    /// Release resources and persist anything still pending
    async fn close(&self) -> Result<(), DataError>;

    /// Backend name for logs
    fn backend_name(&self) -> &'static str;
}
