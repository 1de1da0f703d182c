//! Shared API types
//!
//! Error responses are JSON `{error, code, message}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use osmetrics::model::MetricError;

use crate::data::DataError;

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    ServiceUnavailable { message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    pub fn metric_not_found(kind: &str, id: &str) -> Self {
        Self::not_found(
            "METRIC_NOT_FOUND",
            format!("No {} metric named '{}'", kind, id),
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MetricError> for ApiError {
    fn from(e: MetricError) -> Self {
        let code = match &e {
            MetricError::EmptyId => "EMPTY_ID",
            MetricError::UnsupportedKind(_) => "UNSUPPORTED_TYPE",
            MetricError::MissingPayload { .. } | MetricError::ConflictingPayload { .. } => {
                "INVALID_PAYLOAD"
            }
            MetricError::InvalidValue { .. } | MetricError::NonFinite { .. } => "INVALID_VALUE",
            MetricError::CounterOverflow { .. } => "COUNTER_OVERFLOW",
        };
        Self::bad_request(code, e.to_string())
    }
}

impl From<DataError> for ApiError {
    fn from(e: DataError) -> Self {
        match e {
            DataError::Metric(e) => e.into(),
            DataError::Conflict(message) => {
                tracing::warn!(%message, "Storage conflict");
                Self::conflict("CONFLICT", message)
            }
            DataError::Timeout { .. } | DataError::Connection { .. } => {
                tracing::error!(error = %e, "Storage unavailable");
                Self::service_unavailable("Storage unavailable")
            }
            e => {
                tracing::error!(error = %e, "Data error");
                Self::internal("Storage operation failed")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, code, message) = match self {
            Self::BadRequest { code, message } => ("bad_request", code, message),
            Self::NotFound { code, message } => ("not_found", code, message),
            Self::Conflict { code, message } => ("conflict", code, message),
            Self::ServiceUnavailable { message } => (
                "service_unavailable",
                "SERVICE_UNAVAILABLE".to_string(),
                message,
            ),
            Self::Internal { message } => ("internal_error", "INTERNAL".to_string(), message),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}
