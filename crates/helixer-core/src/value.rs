//! Type recovery for metric values.
//!
//! Two rules exist and they intentionally differ:
//!
//! | Input | Rule | String output |
//! |-------|------|---------------|
//! | Raw entity value (text) | [`infer_value`]: boolean → integer → float → string | wrapped in `"` |
//! | Attribute value (typed) | [`typed_value`]: mapped by JSON type | as-is |

use crate::record::{AttributeValue, MetricValue};

/// Recover a typed value from an untyped entity value.
///
/// Rules are applied in order and the first match wins:
/// 1. `true` / `false` in any letter case → boolean
/// 2. ASCII digits only → integer
/// 3. ASCII digits with exactly one `.` → float
/// 4. anything else → string, wrapped in literal double quotes
///
/// A digit string too large for `i64` is read as a float.
///
/// # Examples
///
/// ```
/// use helixer_core::{infer_value, MetricValue};
///
/// assert_eq!(infer_value("FALSE"), MetricValue::Boolean(false));
/// assert_eq!(infer_value("42"), MetricValue::Integer(42));
/// assert_eq!(infer_value("42.0"), MetricValue::Float(42.0));
/// assert_eq!(infer_value("idle"), MetricValue::String("\"idle\"".to_string()));
/// ```
#[must_use]
pub fn infer_value(raw: &str) -> MetricValue {
    if raw.eq_ignore_ascii_case("true") {
        return MetricValue::Boolean(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return MetricValue::Boolean(false);
    }

    let digits = is_digits(raw);
    if digits {
        if let Ok(value) = raw.parse::<i64>() {
            return MetricValue::Integer(value);
        }
    }

    if digits || is_decimal(raw) {
        if let Ok(value) = raw.parse::<f64>() {
            return MetricValue::Float(value);
        }
    }

    MetricValue::String(format!("\"{raw}\""))
}

/// Map an already-typed attribute value to a metric value.
///
/// Booleans, integers that fit `i64`, floats and strings map directly.
/// Anything else (null, nested sequences or mappings, unsigned integers
/// above `i64::MAX`) is sent as its JSON text and logged at `warn`.
#[must_use]
pub fn typed_value(value: &AttributeValue) -> MetricValue {
    match value {
        AttributeValue::Bool(v) => MetricValue::Boolean(*v),
        AttributeValue::Number(n) => {
            if let Some(v) = n.as_i64() {
                MetricValue::Integer(v)
            } else if let (true, Some(v)) = (n.is_f64(), n.as_f64()) {
                MetricValue::Float(v)
            } else {
                unsupported(value)
            }
        }
        AttributeValue::String(v) => MetricValue::String(v.clone()),
        _ => unsupported(value),
    }
}

fn unsupported(value: &AttributeValue) -> MetricValue {
    let rendered = value.to_string();
    tracing::warn!(
        kind = kind_of(value),
        value = %rendered,
        "Unsupported attribute value type, sending as string"
    );
    MetricValue::String(rendered)
}

fn kind_of(value: &AttributeValue) -> &'static str {
    match value {
        AttributeValue::Null => "null",
        AttributeValue::Bool(_) => "boolean",
        AttributeValue::Number(_) => "number",
        AttributeValue::String(_) => "string",
        AttributeValue::Array(_) => "sequence",
        AttributeValue::Object(_) => "mapping",
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_decimal(s: &str) -> bool {
    let mut dots = 0;
    let mut digits = 0;
    for b in s.bytes() {
        match b {
            b'.' => dots += 1,
            b'0'..=b'9' => digits += 1,
            _ => return false,
        }
    }
    dots == 1 && digits > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn booleans_any_case() {
        assert_eq!(infer_value("true"), MetricValue::Boolean(true));
        assert_eq!(infer_value("True"), MetricValue::Boolean(true));
        assert_eq!(infer_value("FALSE"), MetricValue::Boolean(false));
        assert_eq!(infer_value("fAlSe"), MetricValue::Boolean(false));
    }

    #[test]
    #[allow(clippy::approx_constant)]
    fn integers_and_floats() {
        assert_eq!(infer_value("42"), MetricValue::Integer(42));
        assert_eq!(infer_value("007"), MetricValue::Integer(7));
        assert_eq!(infer_value("3.14"), MetricValue::Float(3.14));
        assert_eq!(infer_value("42.0"), MetricValue::Float(42.0));
        assert_eq!(infer_value(".5"), MetricValue::Float(0.5));
        assert_eq!(infer_value("5."), MetricValue::Float(5.0));
    }

    #[test]
    fn oversized_digits_become_float() {
        assert_eq!(
            infer_value("99999999999999999999"),
            MetricValue::Float(99_999_999_999_999_999_999.0)
        );
    }

    #[test]
    fn everything_else_is_quoted_string() {
        assert_eq!(
            infer_value("hello"),
            MetricValue::String("\"hello\"".to_string())
        );
        assert_eq!(infer_value(""), MetricValue::String("\"\"".to_string()));
        assert_eq!(infer_value("-5"), MetricValue::String("\"-5\"".to_string()));
        assert_eq!(
            infer_value("1.2.3"),
            MetricValue::String("\"1.2.3\"".to_string())
        );
        assert_eq!(infer_value("."), MetricValue::String("\".\"".to_string()));
        assert_eq!(
            infer_value("unavailable"),
            MetricValue::String("\"unavailable\"".to_string())
        );
    }

    #[test]
    fn typed_values_map_directly() {
        assert_eq!(typed_value(&json!(true)), MetricValue::Boolean(true));
        assert_eq!(typed_value(&json!(-12)), MetricValue::Integer(-12));
        assert_eq!(typed_value(&json!(2.5)), MetricValue::Float(2.5));
        assert_eq!(
            typed_value(&json!("hello")),
            MetricValue::String("hello".to_string())
        );
    }

    #[test]
    fn typed_strings_are_not_inferred() {
        assert_eq!(
            typed_value(&json!("42")),
            MetricValue::String("42".to_string())
        );
    }

    #[test]
    fn unsupported_values_are_stringified() {
        assert_eq!(
            typed_value(&json!(null)),
            MetricValue::String("null".to_string())
        );
        assert_eq!(
            typed_value(&json!([1, 2])),
            MetricValue::String("[1,2]".to_string())
        );
        assert_eq!(
            typed_value(&json!({"a": 1})),
            MetricValue::String("{\"a\":1}".to_string())
        );
        assert_eq!(
            typed_value(&json!(u64::MAX)),
            MetricValue::String(u64::MAX.to_string())
        );
    }
}
