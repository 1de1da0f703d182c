//! HTTP transport for metric delivery

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;

use super::error::DeliveryError;
use super::transform::PayloadTransform;
use super::{HealthProbe, MetricSender};
use crate::core::constants::{PATH_HEALTH, PATH_UPDATE, PATH_UPDATES};
use crate::model::Metric;

/// Posts JSON metrics to the collector through a transform chain
pub struct HttpSender {
    client: reqwest::Client,
    base_url: String,
    transforms: Vec<Box<dyn PayloadTransform>>,
}

impl HttpSender {
    /// `address` is either `host:port` or a full base URL
    pub fn new(address: &str, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url(address),
            transforms: Vec::new(),
        })
    }

    /// Append a transform; transforms run in the order they were added
    pub fn with_transform(mut self, transform: impl PayloadTransform + 'static) -> Self {
        tracing::debug!(transform = transform.name(), "Registered payload transform");
        self.transforms.push(Box::new(transform));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<(), DeliveryError> {
        let mut body = serde_json::to_vec(payload)?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for transform in &self.transforms {
            body = transform.apply(body, &mut headers)?;
        }

        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::status(status.as_u16(), url));
        }
        Ok(())
    }
}

fn base_url(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

#[async_trait]
impl MetricSender for HttpSender {
    async fn send(&self, metric: &Metric) -> Result<(), DeliveryError> {
        self.post_json(PATH_UPDATE, metric).await?;
        tracing::trace!(metric_id = metric.id(), "Metric delivered");
        Ok(())
    }

    async fn send_batch(&self, batch: &[Metric]) -> Result<(), DeliveryError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.post_json(PATH_UPDATES, batch).await?;
        tracing::debug!(count = batch.len(), "Batch delivered");
        Ok(())
    }
}

#[async_trait]
impl HealthProbe for HttpSender {
    async fn probe(&self) -> Result<(), DeliveryError> {
        let url = self.url(PATH_HEALTH);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::status(status.as_u16(), url))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::transform::{GzipCompressor, HmacSigner};
    use httpmock::prelude::*;

    fn sender_for(server: &MockServer) -> HttpSender {
        HttpSender::new(&server.address().to_string(), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_base_url() {
        assert_eq!(base_url("localhost:8090"), "http://localhost:8090");
        assert_eq!(base_url("https://metrics.local/"), "https://metrics.local");
    }

    #[tokio::test]
    async fn test_send_posts_json() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/update")
                    .header("content-type", "application/json")
                    .json_body(serde_json::json!({"id": "PollCount", "type": "counter", "delta": 1}));
                then.status(200);
            })
            .await;

        let sender = sender_for(&server);
        let metric = Metric::counter("PollCount", 1).unwrap();
        sender.send(&metric).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_batch_posts_array() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/updates").json_body(serde_json::json!([
                    {"id": "Alloc", "type": "gauge", "value": 1.5},
                    {"id": "PollCount", "type": "counter", "delta": 2}
                ]));
                then.status(200);
            })
            .await;

        let sender = sender_for(&server);
        let batch = vec![
            Metric::gauge("Alloc", 1.5).unwrap(),
            Metric::counter("PollCount", 2).unwrap(),
        ];
        sender.send_batch(&batch).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transforms_set_headers() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/update")
                    .header("content-encoding", "gzip")
                    .header_exists("HashSHA256");
                then.status(200);
            })
            .await;

        let sender = sender_for(&server)
            .with_transform(HmacSigner::new("secret"))
            .with_transform(GzipCompressor::default());
        let metric = Metric::gauge("Alloc", 3.0).unwrap();
        sender.send(&metric).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/update");
                then.status(500);
            })
            .await;

        let sender = sender_for(&server);
        let metric = Metric::gauge("Alloc", 3.0).unwrap();
        let err = sender.send(&metric).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_probe() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/health");
                then.status(200);
            })
            .await;

        let sender = sender_for(&server);
        assert!(sender.probe().await.is_ok());
    }

    #[tokio::test]
    async fn test_probe_unreachable() {
        // Port 9 (discard) is not served in the test environment
        let sender = HttpSender::new("127.0.0.1:9", Duration::from_millis(500)).unwrap();
        assert!(matches!(
            sender.probe().await,
            Err(DeliveryError::Transport(_))
        ));
    }
}
