//! Metric delivery
//!
//! - [`MetricSender`]: deliver one metric or a batch
//! - [`HealthProbe`]: ask the collector whether it is ready
//! - [`HttpSender`]: both, over HTTP with a chain of [`transform::PayloadTransform`]s

mod error;
mod http;
pub mod transform;

pub use error::{DeliveryError, TransformError};
pub use http::HttpSender;

use async_trait::async_trait;

use crate::model::Metric;

#[async_trait]
pub trait MetricSender: Send + Sync {
    /// Deliver a single metric
    async fn send(&self, metric: &Metric) -> Result<(), DeliveryError>;

    /// Deliver a batch in one request
    async fn send_batch(&self, batch: &[Metric]) -> Result<(), DeliveryError>;
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// `Ok` when the collector reports itself healthy
    async fn probe(&self) -> Result<(), DeliveryError>;
}
