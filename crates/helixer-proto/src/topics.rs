//! MQTT topic scheme for device data.
//!
//! Topic structure: `spBv1.0/homeassistant/DDATA/{base_path}/{entity/path}`
//!
//! The entity id's `.` separators become topic levels, so
//! `sensor.kitchen` publishes under `.../sensor/kitchen`.

use serde::{Deserialize, Serialize};

/// Sparkplug namespace.
pub const NAMESPACE: &str = "spBv1.0";

/// Sparkplug group id.
pub const GROUP_ID: &str = "homeassistant";

/// Message type for device data.
pub const DDATA: &str = "DDATA";

/// Topic scheme configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicScheme {
    base_path: String,
    prefix: String,
}

impl Default for TopicScheme {
    fn default() -> Self {
        Self::new("helixer")
    }
}

impl TopicScheme {
    /// Create a topic scheme for the given base path.
    ///
    /// Separators are normalized once here: leading and trailing `/` are
    /// dropped and repeated `/` collapse to one. An empty base path omits
    /// the segment.
    #[must_use]
    pub fn new(base_path: impl AsRef<str>) -> Self {
        let base_path = base_path
            .as_ref()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");

        let prefix = if base_path.is_empty() {
            format!("{NAMESPACE}/{GROUP_ID}/{DDATA}")
        } else {
            format!("{NAMESPACE}/{GROUP_ID}/{DDATA}/{base_path}")
        };

        Self { base_path, prefix }
    }

    /// The normalized base path.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Topic for an entity's device data.
    #[must_use]
    pub fn ddata(&self, entity_id: &str) -> String {
        format!("{}/{}", self.prefix, entity_id.replace('.', "/"))
    }

    /// Wildcard subscription for all device data under the base path.
    #[must_use]
    pub fn wildcard(&self) -> String {
        format!("{}/#", self.prefix)
    }

    /// Parse a device data topic back into an entity id.
    ///
    /// Only the first level after the base path is joined with `.`, which
    /// matches `domain.object_id` style identifiers.
    #[must_use]
    pub fn parse_ddata(&self, topic: &str) -> Option<String> {
        let remainder = topic.strip_prefix(&self.prefix)?.strip_prefix('/')?;
        let (domain, object_id) = remainder.split_once('/')?;

        if domain.is_empty() || object_id.is_empty() {
            return None;
        }

        Some(format!("{domain}.{object_id}"))
    }
}
