//! State records, metrics and messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single attribute value: boolean, number, string, sequence or mapping.
pub type AttributeValue = serde_json::Value;

/// Attribute mapping of a state record. Iteration follows insertion order.
pub type Attributes = serde_json::Map<String, AttributeValue>;

/// One observed snapshot of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Raw textual value, untyped
    pub value: String,
    /// Entity metadata
    #[serde(default)]
    pub attributes: Attributes,
    /// When this snapshot was observed
    pub observed_at: DateTime<Utc>,
}

impl StateRecord {
    /// Create a record without attributes.
    #[must_use]
    pub fn new(value: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            attributes: Attributes::new(),
            observed_at,
        }
    }

    /// Add an attribute, builder style.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Observation time in milliseconds since the Unix epoch.
    ///
    /// Sub-millisecond precision is truncated; instants before the epoch
    /// clamp to zero.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        u64::try_from(self.observed_at.timestamp_millis()).unwrap_or(0)
    }
}

/// Typed value of a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MetricValue {
    /// Boolean value
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 string
    String(String),
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Boolean(v) => write!(f, "{v}"),
            MetricValue::Integer(v) => write!(f, "{v}"),
            MetricValue::Float(v) => write!(f, "{v:?}"),
            MetricValue::String(v) => write!(f, "{v}"),
        }
    }
}

/// One named, typed, timestamped datum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Path-like name, e.g. `state` or `attributes/brightness`
    pub name: String,
    /// Typed value
    pub value: MetricValue,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

impl Metric {
    /// Create a new metric.
    #[must_use]
    pub fn new(name: impl Into<String>, value: MetricValue, timestamp_ms: u64) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp_ms,
        }
    }
}

/// An ordered list of metrics plus a message timestamp.
///
/// The encoder never produces a message without metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    /// Metrics in emission order
    pub metrics: Vec<Metric>,
}

impl Message {
    /// Look up a metric by name.
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Metric names in emission order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|m| m.name.as_str())
    }

    /// Number of metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Whether the message carries no metrics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
