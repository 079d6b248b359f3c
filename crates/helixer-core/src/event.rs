//! State-change events delivered by the host event source.
//!
//! The source renders events as JSON:
//!
//! ```json
//! {
//!   "entity_id": "light.desk",
//!   "old_state": {"state": "off", "attributes": {}, "last_updated": "2024-01-01T00:00:00Z"},
//!   "new_state": {"state": "on", "attributes": {"brightness": 128}, "last_updated": "2024-01-01T00:00:05Z"}
//! }
//! ```

use crate::encoder::encode;
use crate::record::{Attributes, Message, StateRecord};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A state-changed event as emitted by the source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawEvent")]
pub struct StateChangedEvent {
    /// Entity identifier, e.g. `sensor.kitchen_temperature`
    pub entity_id: String,
    /// Previous snapshot, absent for newly added entities
    pub old_state: Option<StateRecord>,
    /// New snapshot, absent when the entity was removed
    pub new_state: Option<StateRecord>,
}

impl StateChangedEvent {
    /// Parse an event from its JSON rendering.
    ///
    /// # Errors
    ///
    /// Returns error if the JSON does not describe a state-changed event.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Domain part of the entity id (text before the first `.`).
    #[must_use]
    pub fn domain(&self) -> &str {
        domain_of(&self.entity_id)
    }

    /// Convert to an encodable change.
    ///
    /// Returns `None` when there is no new record.
    #[must_use]
    pub fn into_change(self) -> Option<StateChange> {
        let current = self.new_state?;
        Some(StateChange {
            entity_id: self.entity_id,
            previous: self.old_state,
            current,
        })
    }
}

/// A previous/current pair for one entity, ready for encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    /// Entity identifier
    pub entity_id: String,
    /// Previous snapshot, if any
    pub previous: Option<StateRecord>,
    /// Current snapshot
    pub current: StateRecord,
}

impl StateChange {
    /// Domain part of the entity id.
    #[must_use]
    pub fn domain(&self) -> &str {
        domain_of(&self.entity_id)
    }

    /// Encode this change. See [`encode`].
    #[must_use]
    pub fn encode(&self) -> Option<Message> {
        encode(&self.entity_id, self.previous.as_ref(), &self.current)
    }
}

fn domain_of(entity_id: &str) -> &str {
    entity_id
        .split_once('.')
        .map_or(entity_id, |(domain, _)| domain)
}

#[derive(Deserialize)]
struct RawEvent {
    entity_id: String,
    #[serde(default)]
    old_state: Option<RawState>,
    #[serde(default)]
    new_state: Option<RawState>,
}

#[derive(Deserialize)]
struct RawState {
    state: String,
    #[serde(default)]
    attributes: Option<Attributes>,
    last_updated: Option<DateTime<Utc>>,
    last_changed: Option<DateTime<Utc>>,
}

impl TryFrom<RawState> for StateRecord {
    type Error = String;

    fn try_from(raw: RawState) -> Result<Self, Self::Error> {
        let observed_at = raw
            .last_updated
            .or(raw.last_changed)
            .ok_or_else(|| "state has neither last_updated nor last_changed".to_string())?;

        Ok(StateRecord {
            value: raw.state,
            attributes: raw.attributes.unwrap_or_default(),
            observed_at,
        })
    }
}

impl TryFrom<RawEvent> for StateChangedEvent {
    type Error = String;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        Ok(Self {
            entity_id: raw.entity_id,
            old_state: raw.old_state.map(StateRecord::try_from).transpose()?,
            new_state: raw.new_state.map(StateRecord::try_from).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MetricValue;

    const EVENT: &str = r#"{
        "entity_id": "light.desk",
        "old_state": {
            "entity_id": "light.desk",
            "state": "off",
            "attributes": {"friendly_name": "Desk"},
            "last_changed": "2024-01-01T00:00:00Z",
            "last_updated": "2024-01-01T00:00:00Z"
        },
        "new_state": {
            "entity_id": "light.desk",
            "state": "on",
            "attributes": {"friendly_name": "Desk", "brightness": 128},
            "last_changed": "2024-01-01T00:00:05Z",
            "last_updated": "2024-01-01T00:00:05.250Z"
        }
    }"#;

    #[test]
    fn parse_source_event() {
        let event = StateChangedEvent::from_json(EVENT).unwrap();

        assert_eq!(event.entity_id, "light.desk");
        assert_eq!(event.domain(), "light");

        let old = event.old_state.as_ref().unwrap();
        assert_eq!(old.value, "off");

        let new = event.new_state.as_ref().unwrap();
        assert_eq!(new.value, "on");
        assert_eq!(new.timestamp_ms(), 1_704_067_205_250);
        assert_eq!(new.attributes["brightness"], serde_json::json!(128));
    }

    #[test]
    fn change_encodes_delta() {
        let change = StateChangedEvent::from_json(EVENT)
            .unwrap()
            .into_change()
            .unwrap();
        let message = change.encode().unwrap();

        let names: Vec<_> = message.names().collect();
        assert_eq!(names, ["state", "attributes/brightness"]);
        assert_eq!(
            message.metrics[0].value,
            MetricValue::String("\"on\"".to_string())
        );
    }

    #[test]
    fn removed_entity_has_no_change() {
        let event = StateChangedEvent::from_json(
            r#"{"entity_id": "sensor.gone", "old_state": {"state": "1", "last_updated": "2024-01-01T00:00:00Z"}, "new_state": null}"#,
        )
        .unwrap();

        assert!(event.into_change().is_none());
    }

    #[test]
    fn new_entity_without_old_state() {
        let event = StateChangedEvent::from_json(
            r#"{"entity_id": "sensor.new", "new_state": {"state": "3.5", "last_updated": "2024-01-01T00:00:00Z"}}"#,
        )
        .unwrap();

        let change = event.into_change().unwrap();
        assert!(change.previous.is_none());
        assert!(change.current.attributes.is_empty());
    }

    #[test]
    fn missing_timestamps_are_rejected() {
        let result = StateChangedEvent::from_json(
            r#"{"entity_id": "sensor.x", "new_state": {"state": "1"}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn domain_without_separator() {
        let event = StateChangedEvent {
            entity_id: "weird".to_string(),
            old_state: None,
            new_state: None,
        };
        assert_eq!(event.domain(), "weird");
    }
}
