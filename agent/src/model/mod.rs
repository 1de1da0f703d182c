//! Metric model shared by the agent and the collector
//!
//! A [`Metric`] is either a gauge carrying an absolute `f64` reading or a
//! counter carrying an `i64` increment. The payload is a [`MetricValue`]
//! enum, so a metric with both payloads or neither cannot be represented
//! once constructed. All validation happens in the constructors and in the
//! serde conversion from the wire shape.

mod error;

pub use error::MetricError;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Wire name of the gauge kind
pub const GAUGE: &str = "gauge";

/// Wire name of the counter kind
pub const COUNTER: &str = "counter";

// =============================================================================
// Kind and payload
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => GAUGE,
            MetricKind::Counter => COUNTER,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            GAUGE => Ok(MetricKind::Gauge),
            COUNTER => Ok(MetricKind::Counter),
            _ => Err(MetricError::UnsupportedKind(s.to_string())),
        }
    }
}

/// Kind-tagged payload of a metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// Absolute reading, overwritten on save
    Gauge(f64),
    /// Increment, accumulated on save
    Counter(i64),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Counter(_) => MetricKind::Counter,
        }
    }
}

/// Counters render as integers, gauges in their shortest round-trip form
impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Gauge(v) => write!(f, "{}", v),
            MetricValue::Counter(d) => write!(f, "{}", d),
        }
    }
}

// =============================================================================
// Metric
// =============================================================================

/// A single named measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MetricWire", into = "MetricWire")]
pub struct Metric {
    id: String,
    value: MetricValue,
}

impl Metric {
    /// Build a metric from an id and a payload
    ///
    /// The id is trimmed and must not be empty. Gauge readings must be finite
    /// so that every stored metric survives a JSON snapshot.
    pub fn new(id: impl AsRef<str>, value: MetricValue) -> Result<Self, MetricError> {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(MetricError::EmptyId);
        }
        if let MetricValue::Gauge(v) = value
            && !v.is_finite()
        {
            return Err(MetricError::NonFinite { id: id.to_string() });
        }
        Ok(Self {
            id: id.to_string(),
            value,
        })
    }

    pub fn gauge(id: impl AsRef<str>, value: f64) -> Result<Self, MetricError> {
        Self::new(id, MetricValue::Gauge(value))
    }

    pub fn counter(id: impl AsRef<str>, delta: i64) -> Result<Self, MetricError> {
        Self::new(id, MetricValue::Counter(delta))
    }

    /// Build a metric from its loosely-typed parts (wire or database row)
    ///
    /// Exactly one of `delta` / `value` must be present, matching `kind`.
    pub fn from_parts(
        id: impl AsRef<str>,
        kind: &str,
        delta: Option<i64>,
        value: Option<f64>,
    ) -> Result<Self, MetricError> {
        let kind: MetricKind = kind.parse()?;
        let id = id.as_ref();
        match (kind, delta, value) {
            (_, Some(_), Some(_)) => Err(MetricError::ConflictingPayload { id: id.to_string() }),
            (MetricKind::Gauge, None, Some(v)) => Self::gauge(id, v),
            (MetricKind::Counter, Some(d), None) => Self::counter(id, d),
            (kind, _, _) => Err(MetricError::MissingPayload {
                id: id.to_string(),
                kind,
            }),
        }
    }

    /// Build a metric from raw path segments, e.g. `("counter", "PollCount", "5")`
    pub fn parse(kind: &str, id: &str, raw: &str) -> Result<Self, MetricError> {
        let kind: MetricKind = kind.parse()?;
        let raw_trimmed = raw.trim();
        let invalid = || MetricError::InvalidValue {
            kind,
            raw: raw.to_string(),
        };
        let value = match kind {
            MetricKind::Gauge => MetricValue::Gauge(raw_trimmed.parse().map_err(|_| invalid())?),
            MetricKind::Counter => {
                MetricValue::Counter(raw_trimmed.parse().map_err(|_| invalid())?)
            }
        };
        Self::new(id, value)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }

    pub fn value(&self) -> MetricValue {
        self.value
    }

    pub fn gauge_value(&self) -> Option<f64> {
        match self.value {
            MetricValue::Gauge(v) => Some(v),
            MetricValue::Counter(_) => None,
        }
    }

    pub fn counter_delta(&self) -> Option<i64> {
        match self.value {
            MetricValue::Counter(d) => Some(d),
            MetricValue::Gauge(_) => None,
        }
    }
}

/// Apply one save step to the currently stored state of a series
///
/// Gauges overwrite. Counters add their delta to the stored sum, starting
/// from zero when nothing is stored. A save of a different kind replaces the
/// stored series.
pub fn aggregate(current: Option<&Metric>, incoming: &Metric) -> Result<Metric, MetricError> {
    let value = match (current.map(|m| m.value), incoming.value) {
        (Some(MetricValue::Counter(sum)), MetricValue::Counter(delta)) => {
            let sum = sum
                .checked_add(delta)
                .ok_or_else(|| MetricError::CounterOverflow {
                    id: incoming.id.clone(),
                })?;
            MetricValue::Counter(sum)
        }
        (_, value) => value,
    };
    Ok(Metric {
        id: incoming.id.clone(),
        value,
    })
}

// =============================================================================
// Wire shape
// =============================================================================

/// JSON shape: `{"id", "type", "delta"?, "value"?}`
#[derive(Debug, Serialize, Deserialize)]
struct MetricWire {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delta: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
}

impl TryFrom<MetricWire> for Metric {
    type Error = MetricError;

    fn try_from(wire: MetricWire) -> Result<Self, Self::Error> {
        Metric::from_parts(wire.id, &wire.kind, wire.delta, wire.value)
    }
}

impl From<Metric> for MetricWire {
    fn from(metric: Metric) -> Self {
        let (delta, value) = match metric.value {
            MetricValue::Gauge(v) => (None, Some(v)),
            MetricValue::Counter(d) => (Some(d), None),
        };
        Self {
            id: metric.id,
            kind: metric.value.kind().as_str().to_string(),
            delta,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_reject_empty_id() {
        assert_eq!(Metric::gauge("", 1.0), Err(MetricError::EmptyId));
        assert_eq!(Metric::counter("   ", 1), Err(MetricError::EmptyId));
    }

    #[test]
    fn test_id_is_trimmed() {
        let m = Metric::gauge("  Alloc ", 1.0).unwrap();
        assert_eq!(m.id(), "Alloc");
    }

    #[test]
    fn test_gauge_rejects_non_finite() {
        assert!(matches!(
            Metric::gauge("Alloc", f64::NAN),
            Err(MetricError::NonFinite { .. })
        ));
        assert!(matches!(
            Metric::gauge("Alloc", f64::INFINITY),
            Err(MetricError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("gauge".parse::<MetricKind>().unwrap(), MetricKind::Gauge);
        assert_eq!(" Counter ".parse::<MetricKind>().unwrap(), MetricKind::Counter);
        assert!(matches!(
            "histogram".parse::<MetricKind>(),
            Err(MetricError::UnsupportedKind(_))
        ));
    }

    #[test]
    fn test_parse_raw_values() {
        let g = Metric::parse("gauge", "Alloc", "123.5").unwrap();
        assert_eq!(g.gauge_value(), Some(123.5));

        let c = Metric::parse("counter", "PollCount", "7").unwrap();
        assert_eq!(c.counter_delta(), Some(7));

        assert!(matches!(
            Metric::parse("counter", "PollCount", "1.5"),
            Err(MetricError::InvalidValue { .. })
        ));
        assert!(matches!(
            Metric::parse("gauge", "Alloc", "abc"),
            Err(MetricError::InvalidValue { .. })
        ));
        assert!(matches!(
            Metric::parse("summary", "Alloc", "1"),
            Err(MetricError::UnsupportedKind(_))
        ));
        assert_eq!(Metric::parse("gauge", "", "1"), Err(MetricError::EmptyId));
    }

    #[test]
    fn test_from_parts_payload_rules() {
        assert!(Metric::from_parts("a", "gauge", None, Some(1.0)).is_ok());
        assert!(Metric::from_parts("a", "counter", Some(1), None).is_ok());
        assert!(matches!(
            Metric::from_parts("a", "gauge", Some(1), Some(1.0)),
            Err(MetricError::ConflictingPayload { .. })
        ));
        assert!(matches!(
            Metric::from_parts("a", "counter", None, None),
            Err(MetricError::MissingPayload { .. })
        ));
        assert!(matches!(
            Metric::from_parts("a", "gauge", Some(3), None),
            Err(MetricError::MissingPayload { .. })
        ));
    }

    #[test]
    fn test_json_shape() {
        let gauge = Metric::gauge("Alloc", 10.5).unwrap();
        assert_eq!(
            serde_json::to_string(&gauge).unwrap(),
            r#"{"id":"Alloc","type":"gauge","value":10.5}"#
        );

        let counter = Metric::counter("PollCount", 3).unwrap();
        assert_eq!(
            serde_json::to_string(&counter).unwrap(),
            r#"{"id":"PollCount","type":"counter","delta":3}"#
        );
    }

    #[test]
    fn test_json_rejects_invalid_payload() {
        let both = r#"{"id":"x","type":"gauge","value":1.0,"delta":1}"#;
        assert!(serde_json::from_str::<Metric>(both).is_err());

        let neither = r#"{"id":"x","type":"counter"}"#;
        assert!(serde_json::from_str::<Metric>(neither).is_err());

        let empty_id = r#"{"id":"","type":"counter","delta":1}"#;
        assert!(serde_json::from_str::<Metric>(empty_id).is_err());

        let batch = r#"[{"id":"a","type":"gauge","value":2},{"id":"b","type":"counter","delta":5}]"#;
        let parsed: Vec<Metric> = serde_json::from_str(batch).unwrap();
        assert_eq!(parsed[0].gauge_value(), Some(2.0));
        assert_eq!(parsed[1].counter_delta(), Some(5));
    }

    #[test]
    fn test_aggregate_counter_accumulates() {
        let first = Metric::counter("PollCount", 2).unwrap();
        let stored = aggregate(None, &first).unwrap();
        assert_eq!(stored.counter_delta(), Some(2));

        let next = Metric::counter("PollCount", 3).unwrap();
        let stored = aggregate(Some(&stored), &next).unwrap();
        assert_eq!(stored.counter_delta(), Some(5));
    }

    #[test]
    fn test_aggregate_gauge_overwrites() {
        let stored = Metric::gauge("Alloc", 10.0).unwrap();
        let next = Metric::gauge("Alloc", 20.0).unwrap();
        let stored = aggregate(Some(&stored), &next).unwrap();
        assert_eq!(stored.gauge_value(), Some(20.0));
    }

    #[test]
    fn test_aggregate_kind_change_replaces() {
        let stored = Metric::gauge("x", 10.0).unwrap();
        let next = Metric::counter("x", 4).unwrap();
        let stored = aggregate(Some(&stored), &next).unwrap();
        assert_eq!(stored.counter_delta(), Some(4));
    }

    #[test]
    fn test_aggregate_overflow() {
        let stored = Metric::counter("x", i64::MAX).unwrap();
        let next = Metric::counter("x", 1).unwrap();
        assert!(matches!(
            aggregate(Some(&stored), &next),
            Err(MetricError::CounterOverflow { .. })
        ));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(MetricValue::Gauge(20.0).to_string(), "20");
        assert_eq!(MetricValue::Gauge(0.125).to_string(), "0.125");
        assert_eq!(MetricValue::Counter(-3).to_string(), "-3");
    }
}
