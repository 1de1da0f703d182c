//! HTTP middleware (signature check, 404 handler)

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use osmetrics::core::constants::HASH_HEADER;
use osmetrics::signing::verify;

use super::types::ApiError;
use crate::core::constants::DEFAULT_BODY_LIMIT;

/// Shared secret for request signatures
#[derive(Clone)]
pub struct SignatureKey(pub Arc<[u8]>);

/// Reject POST requests whose `HashSHA256` header does not match the body
///
/// Runs inside request decompression, so the signature is checked against
/// the plain body the agent signed.
pub async fn verify_signature(
    State(key): State<SignatureKey>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if req.method() != Method::POST {
        return Ok(next.run(req).await);
    }

    let Some(signature) = req
        .headers()
        .get(HASH_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
    else {
        tracing::debug!(uri = %req.uri(), "Missing request signature");
        return Err(ApiError::bad_request(
            "MISSING_SIGNATURE",
            format!("{} header is required", HASH_HEADER),
        ));
    };

    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, DEFAULT_BODY_LIMIT)
        .await
        .map_err(|e| ApiError::bad_request("INVALID_BODY", e.to_string()))?;

    if !verify(&key.0, &bytes, &signature) {
        tracing::warn!(uri = %parts.uri, "Request signature mismatch");
        return Err(ApiError::bad_request(
            "INVALID_SIGNATURE",
            "Request signature does not match body",
        ));
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Handle 404 Not Found with logging
pub async fn handle_404(req: Request) -> impl IntoResponse {
    tracing::debug!("[404] {} {}", req.method(), req.uri());
    StatusCode::NOT_FOUND
}
