//! Delivery error types

use thiserror::Error;

use crate::signing::InvalidKey;

/// Failure inside a payload transform
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Compression failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    InvalidKey(#[from] InvalidKey),

    #[error("Invalid header value: {0}")]
    Header(String),
}

/// Per-request delivery failure
///
/// Delivery errors never stop the pipeline; the caller logs them and drops
/// the affected sample.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} responded with status {status}")]
    Status { status: u16, url: String },

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Payload transform failed: {0}")]
    Transform(#[from] TransformError),
}

impl DeliveryError {
    pub fn status(status: u16, url: impl Into<String>) -> Self {
        Self::Status {
            status,
            url: url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = DeliveryError::status(500, "http://localhost:8090/update");
        assert_eq!(
            err.to_string(),
            "http://localhost:8090/update responded with status 500"
        );
    }

    #[test]
    fn test_transform_display() {
        let err = DeliveryError::from(TransformError::from(InvalidKey));
        assert_eq!(err.to_string(), "Payload transform failed: Invalid signing key");
    }
}
