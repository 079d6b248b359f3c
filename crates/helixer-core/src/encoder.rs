//! Delta encoding of state records into metric messages.
//!
//! Metric naming:
//!
//! | Source | Metric name |
//! |--------|-------------|
//! | entity value | `state` |
//! | scalar attribute `k` | `attributes/k` |
//! | mapping attribute `k` | `attributes/k.{subkey}` per entry |
//! | sequence attribute `k` | `attributes/k.{index}` per item |
//!
//! Only one level is flattened; deeper structures go through
//! [`typed_value`] and are sent as text.

use crate::diff::changed_attributes;
use crate::record::{AttributeValue, Message, Metric, StateRecord};
use crate::value::{infer_value, typed_value};

/// Name of the metric carrying the entity value.
pub const STATE_METRIC: &str = "state";

/// Prefix of attribute metric names.
pub const ATTRIBUTE_PREFIX: &str = "attributes/";

/// Encode the change between two snapshots of an entity.
///
/// With no `previous` record the full current snapshot is encoded. Returns
/// `None` when nothing changed, so empty messages never leave the encoder.
#[must_use]
pub fn encode(
    entity_id: &str,
    previous: Option<&StateRecord>,
    current: &StateRecord,
) -> Option<Message> {
    let timestamp_ms = current.timestamp_ms();
    let mut metrics = Vec::new();

    if previous.map_or(true, |prev| prev.value != current.value) {
        metrics.push(Metric::new(
            STATE_METRIC,
            infer_value(&current.value),
            timestamp_ms,
        ));
    }

    let previous_attributes = previous.map(|p| &p.attributes);
    for (key, value) in changed_attributes(previous_attributes, &current.attributes) {
        flatten_attribute(key, value, timestamp_ms, &mut metrics);
    }

    if metrics.is_empty() {
        tracing::trace!(entity_id, "No changes, suppressing message");
        return None;
    }

    tracing::debug!(entity_id, metrics = metrics.len(), "Encoded state change");

    Some(Message {
        timestamp_ms,
        metrics,
    })
}

/// Expand one changed attribute into metrics.
///
/// Non-empty mappings and sequences yield one metric per entry. Everything
/// else, empty containers included, yields a single `attributes/{key}`.
fn flatten_attribute(
    key: &str,
    value: &AttributeValue,
    timestamp_ms: u64,
    metrics: &mut Vec<Metric>,
) {
    match value {
        AttributeValue::Object(entries) if !entries.is_empty() => {
            for (subkey, subvalue) in entries {
                metrics.push(Metric::new(
                    format!("{ATTRIBUTE_PREFIX}{key}.{subkey}"),
                    typed_value(subvalue),
                    timestamp_ms,
                ));
            }
        }
        AttributeValue::Array(items) if !items.is_empty() => {
            for (index, item) in items.iter().enumerate() {
                metrics.push(Metric::new(
                    format!("{ATTRIBUTE_PREFIX}{key}.{index}"),
                    typed_value(item),
                    timestamp_ms,
                ));
            }
        }
        _ => metrics.push(Metric::new(
            format!("{ATTRIBUTE_PREFIX}{key}"),
            typed_value(value),
            timestamp_ms,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MetricValue;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn at(secs: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn record(value: &str, attributes: serde_json::Value) -> StateRecord {
        let mut record = StateRecord::new(value, at(1_704_067_200));
        if let serde_json::Value::Object(map) = attributes {
            record.attributes = map;
        }
        record
    }

    #[test]
    fn identical_records_produce_nothing() {
        let a = record("21.5", json!({"unit": "°C", "rgb": [1, 2], "cfg": {"x": 1}}));
        let b = a.clone();
        assert!(encode("sensor.kitchen", Some(&a), &b).is_none());
    }

    #[test]
    fn first_observation_is_full_snapshot() {
        let current = record(
            "on",
            json!({"brightness": 128, "rgb": [10, 20], "effect": {"name": "pulse", "speed": 1.5}}),
        );

        let message = encode("light.desk", None, &current).unwrap();
        let names: Vec<_> = message.names().collect();

        assert_eq!(
            names,
            [
                "state",
                "attributes/brightness",
                "attributes/rgb.0",
                "attributes/rgb.1",
                "attributes/effect.name",
                "attributes/effect.speed",
            ]
        );
        assert_eq!(
            message.metric("state").unwrap().value,
            MetricValue::String("\"on\"".to_string())
        );
        assert_eq!(
            message.metric("attributes/effect.name").unwrap().value,
            MetricValue::String("pulse".to_string())
        );
    }

    #[test]
    fn timestamps_are_milliseconds() {
        let current = record("1", json!({"a": true}));
        let message = encode("sensor.x", None, &current).unwrap();

        assert_eq!(message.timestamp_ms, 1_704_067_200_000);
        assert!(message
            .metrics
            .iter()
            .all(|m| m.timestamp_ms == 1_704_067_200_000));
    }

    #[test]
    fn value_change_only() {
        let previous = record("41", json!({"unit": "W"}));
        let current = record("42", json!({"unit": "W"}));

        let message = encode("sensor.power", Some(&previous), &current).unwrap();

        assert_eq!(message.len(), 1);
        assert_eq!(message.metrics[0].name, "state");
        assert_eq!(message.metrics[0].value, MetricValue::Integer(42));
    }

    #[test]
    fn attribute_change_only() {
        let previous = record("on", json!({"brightness": 100}));
        let current = record("on", json!({"brightness": 200}));

        let message = encode("light.desk", Some(&previous), &current).unwrap();

        assert_eq!(message.len(), 1);
        assert_eq!(message.metrics[0].name, "attributes/brightness");
        assert_eq!(message.metrics[0].value, MetricValue::Integer(200));
    }

    #[test]
    fn removed_attributes_are_not_emitted() {
        let previous = record("on", json!({"brightness": 100, "effect": "pulse"}));
        let current = record("on", json!({"brightness": 100}));

        assert!(encode("light.desk", Some(&previous), &current).is_none());
    }

    #[test]
    fn nested_mapping_flattens_one_level() {
        let current = record("x", json!({"a": {"x": 1, "y": 2}}));
        let previous = StateRecord {
            attributes: crate::record::Attributes::new(),
            ..current.clone()
        };

        let message = encode("sensor.a", Some(&previous), &current).unwrap();
        let names: Vec<_> = message.names().collect();

        assert_eq!(names, ["attributes/a.x", "attributes/a.y"]);
    }

    #[test]
    fn sequence_flattens_by_index() {
        let current = record("x", json!({"a": [10, 20]}));
        let previous = StateRecord {
            attributes: crate::record::Attributes::new(),
            ..current.clone()
        };

        let message = encode("sensor.a", Some(&previous), &current).unwrap();

        assert_eq!(message.metrics[0].name, "attributes/a.0");
        assert_eq!(message.metrics[0].value, MetricValue::Integer(10));
        assert_eq!(message.metrics[1].name, "attributes/a.1");
        assert_eq!(message.metrics[1].value, MetricValue::Integer(20));
    }

    #[test]
    fn deeper_nesting_is_stringified() {
        let current = record("x", json!({"a": {"inner": {"deep": 1}}, "b": [[1, 2]]}));
        let message = encode("sensor.a", None, &current).unwrap();

        assert_eq!(
            message.metric("attributes/a.inner").unwrap().value,
            MetricValue::String("{\"deep\":1}".to_string())
        );
        assert_eq!(
            message.metric("attributes/b.0").unwrap().value,
            MetricValue::String("[1,2]".to_string())
        );
    }

    #[test]
    fn attribute_strings_are_not_quoted() {
        let current = record("hello", json!({"greeting": "hello"}));
        let message = encode("sensor.a", None, &current).unwrap();

        assert_eq!(
            message.metric("state").unwrap().value,
            MetricValue::String("\"hello\"".to_string())
        );
        assert_eq!(
            message.metric("attributes/greeting").unwrap().value,
            MetricValue::String("hello".to_string())
        );
    }

    #[test]
    fn empty_containers_emit_one_metric_each() {
        let current = record("on", json!({"list": [], "map": {}}));
        let message = encode("light.desk", None, &current).unwrap();

        let names: Vec<_> = message.names().collect();
        assert_eq!(names, ["state", "attributes/list", "attributes/map"]);
        assert_eq!(
            message.metric("attributes/list").unwrap().value,
            MetricValue::String("[]".to_string())
        );
        assert_eq!(
            message.metric("attributes/map").unwrap().value,
            MetricValue::String("{}".to_string())
        );
    }

    #[test]
    fn emptied_container_is_a_change() {
        let previous = record("x", json!({"list": [1]}));
        let current = record("x", json!({"list": []}));

        let message = encode("sensor.a", Some(&previous), &current).unwrap();
        let names: Vec<_> = message.names().collect();
        assert_eq!(names, ["attributes/list"]);
    }
}
