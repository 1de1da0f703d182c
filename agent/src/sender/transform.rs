//! Byte transforms applied to request bodies before transport
//!
//! Transforms run in registration order. Each one may rewrite the body and
//! add headers; the collector undoes them in reverse order.

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::header::{CONTENT_ENCODING, HeaderMap, HeaderName, HeaderValue};

use super::error::TransformError;
use crate::core::constants::HASH_HEADER;
use crate::signing::sign;

pub trait PayloadTransform: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, body: Vec<u8>, headers: &mut HeaderMap) -> Result<Vec<u8>, TransformError>;
}

// =============================================================================
// Signing
// =============================================================================

/// Adds the `HashSHA256` header; leaves the body untouched
pub struct HmacSigner {
    key: Vec<u8>,
}

impl HmacSigner {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
        }
    }
}

impl PayloadTransform for HmacSigner {
    fn name(&self) -> &'static str {
        "hmac-sha256"
    }

    fn apply(&self, body: Vec<u8>, headers: &mut HeaderMap) -> Result<Vec<u8>, TransformError> {
        let signature = sign(&self.key, &body)?;
        let value =
            HeaderValue::from_str(&signature).map_err(|e| TransformError::Header(e.to_string()))?;
        let name = HeaderName::from_bytes(HASH_HEADER.as_bytes())
            .map_err(|e| TransformError::Header(e.to_string()))?;
        headers.insert(name, value);
        Ok(body)
    }
}

// =============================================================================
// Compression
// =============================================================================

/// Gzip-encodes the body and sets `Content-Encoding: gzip`
pub struct GzipCompressor {
    level: Compression,
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl PayloadTransform for GzipCompressor {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn apply(&self, body: Vec<u8>, headers: &mut HeaderMap) -> Result<Vec<u8>, TransformError> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), self.level);
        encoder.write_all(&body)?;
        let compressed = encoder.finish()?;
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        Ok(compressed)
    }
}
