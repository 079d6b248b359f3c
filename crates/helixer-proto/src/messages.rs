//! Protobuf payload messages.

use helixer_core::{Message, MetricValue};
use prost::Message as _;

/// Top-level payload published per message.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Payload {
    /// Milliseconds since the Unix epoch
    #[prost(uint64, tag = "1")]
    pub timestamp: u64,
    /// Metrics in emission order
    #[prost(message, repeated, tag = "2")]
    pub metrics: Vec<Metric>,
}

/// A single metric on the wire.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Metric {
    /// Metric name
    #[prost(string, tag = "1")]
    pub name: String,
    /// Milliseconds since the Unix epoch
    #[prost(uint64, tag = "3")]
    pub timestamp: u64,
    /// Typed value
    #[prost(oneof = "metric::Value", tags = "11, 13, 14, 15")]
    pub value: Option<metric::Value>,
}

/// Nested types for [`Metric`].
pub mod metric {
    /// Metric value variants.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        /// Signed 64-bit integer (Sparkplug `long_value` slot)
        #[prost(int64, tag = "11")]
        IntValue(i64),
        /// Double-precision float (Sparkplug `double_value` slot)
        #[prost(double, tag = "13")]
        FloatValue(f64),
        /// Boolean (Sparkplug `boolean_value` slot)
        #[prost(bool, tag = "14")]
        BoolValue(bool),
        /// UTF-8 string (Sparkplug `string_value` slot)
        #[prost(string, tag = "15")]
        StringValue(String),
    }
}

impl From<&MetricValue> for metric::Value {
    fn from(value: &MetricValue) -> Self {
        match value {
            MetricValue::Boolean(v) => Self::BoolValue(*v),
            MetricValue::Integer(v) => Self::IntValue(*v),
            MetricValue::Float(v) => Self::FloatValue(*v),
            MetricValue::String(v) => Self::StringValue(v.clone()),
        }
    }
}

impl From<&metric::Value> for MetricValue {
    fn from(value: &metric::Value) -> Self {
        match value {
            metric::Value::BoolValue(v) => Self::Boolean(*v),
            metric::Value::IntValue(v) => Self::Integer(*v),
            metric::Value::FloatValue(v) => Self::Float(*v),
            metric::Value::StringValue(v) => Self::String(v.clone()),
        }
    }
}

impl From<&helixer_core::Metric> for Metric {
    fn from(metric: &helixer_core::Metric) -> Self {
        Self {
            name: metric.name.clone(),
            timestamp: metric.timestamp_ms,
            value: Some((&metric.value).into()),
        }
    }
}

impl From<&Message> for Payload {
    fn from(message: &Message) -> Self {
        Self {
            timestamp: message.timestamp_ms,
            metrics: message.metrics.iter().map(Metric::from).collect(),
        }
    }
}

impl Payload {
    /// Convert back into the core message model.
    ///
    /// # Errors
    ///
    /// Returns error if a metric carries no value.
    pub fn to_message(&self) -> Result<Message, WireError> {
        let metrics = self
            .metrics
            .iter()
            .map(|m| {
                let value = m
                    .value
                    .as_ref()
                    .ok_or_else(|| WireError::MissingValue(m.name.clone()))?;
                Ok(helixer_core::Metric::new(
                    m.name.clone(),
                    value.into(),
                    m.timestamp,
                ))
            })
            .collect::<Result<Vec<_>, WireError>>()?;

        Ok(Message {
            timestamp_ms: self.timestamp,
            metrics,
        })
    }
}

/// Serialize a message to protobuf bytes.
#[must_use]
pub fn encode_message(message: &Message) -> Vec<u8> {
    Payload::from(message).encode_to_vec()
}

/// Deserialize protobuf bytes into a payload.
///
/// # Errors
///
/// Returns error if the bytes are not a valid payload.
pub fn decode_payload(bytes: &[u8]) -> Result<Payload, WireError> {
    Payload::decode(bytes).map_err(|e| WireError::Decode(e.to_string()))
}

/// Errors for payload decoding.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WireError {
    /// Protobuf decoding failed
    #[error("decode failed: {0}")]
    Decode(String),
    /// A metric had no value set
    #[error("metric '{0}' has no value")]
    MissingValue(String),
}
