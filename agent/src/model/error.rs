//! Metric validation errors

use thiserror::Error;

use super::MetricKind;

/// Errors raised while constructing or aggregating a [`super::Metric`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricError {
    #[error("metric id must not be empty")]
    EmptyId,

    #[error("unsupported metric type '{0}', expected gauge or counter")]
    UnsupportedKind(String),

    #[error("{kind} metric '{id}' has no matching payload")]
    MissingPayload { id: String, kind: MetricKind },

    #[error("metric '{id}' carries both delta and value")]
    ConflictingPayload { id: String },

    #[error("invalid {kind} value '{raw}'")]
    InvalidValue { kind: MetricKind, raw: String },

    #[error("gauge '{id}' value must be finite")]
    NonFinite { id: String },

    #[error("counter '{id}' overflowed")]
    CounterOverflow { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(MetricError::EmptyId.to_string(), "metric id must not be empty");
        assert_eq!(
            MetricError::UnsupportedKind("histogram".into()).to_string(),
            "unsupported metric type 'histogram', expected gauge or counter"
        );
        assert_eq!(
            MetricError::InvalidValue {
                kind: MetricKind::Counter,
                raw: "1.5".into()
            }
            .to_string(),
            "invalid counter value '1.5'"
        );
        assert_eq!(
            MetricError::MissingPayload {
                id: "Alloc".into(),
                kind: MetricKind::Gauge
            }
            .to_string(),
            "gauge metric 'Alloc' has no matching payload"
        );
    }
}
