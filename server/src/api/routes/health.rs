//! Health check endpoints

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::api::AppState;
use crate::api::types::ApiError;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness; never touches storage
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Storage health: 200 when the backend answers, 503 otherwise
pub async fn ping(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    match state.store.health_check().await {
        Ok(()) => Ok(StatusCode::OK),
        Err(e) => {
            tracing::warn!(
                backend = state.store.backend_name(),
                error = %e,
                "Storage health check failed"
            );
            Err(ApiError::service_unavailable("Storage unavailable"))
        }
    }
}
