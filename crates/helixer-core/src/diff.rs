//! Attribute change detection.

use crate::record::{AttributeValue, Attributes};

/// Return the attributes of `current` that are new or changed.
///
/// Without a previous mapping every attribute counts as changed. Keys that
/// exist only in `previous` are not reported: removals are never retracted.
/// Results follow the insertion order of `current`.
#[must_use]
pub fn changed_attributes<'a>(
    previous: Option<&Attributes>,
    current: &'a Attributes,
) -> Vec<(&'a str, &'a AttributeValue)> {
    current
        .iter()
        .filter(|(key, value)| {
            previous.map_or(true, |prev| prev.get(key.as_str()) != Some(*value))
        })
        .map(|(key, value)| (key.as_str(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Attributes {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn everything_changed_without_previous() {
        let current = attrs(json!({"b": 1, "a": "x"}));
        let changed = changed_attributes(None, &current);
        assert_eq!(changed.len(), 2);
        assert_eq!(changed[0].0, "b");
        assert_eq!(changed[1].0, "a");
    }

    #[test]
    fn only_added_or_modified_keys() {
        let previous = attrs(json!({"same": 1, "modified": 1, "removed": true}));
        let current = attrs(json!({"same": 1, "modified": 2, "added": "new"}));

        let changed = changed_attributes(Some(&previous), &current);
        let keys: Vec<_> = changed.iter().map(|(k, _)| *k).collect();

        assert_eq!(keys, ["modified", "added"]);
    }

    #[test]
    fn nested_values_compare_structurally() {
        let previous = attrs(json!({"rgb": [1, 2, 3], "cfg": {"a": 1}}));
        let current = attrs(json!({"rgb": [1, 2, 3], "cfg": {"a": 2}}));

        let changed = changed_attributes(Some(&previous), &current);
        assert_eq!(changed, vec![("cfg", &json!({"a": 2}))]);
    }
}
