//! Stringified-JSON payload normalization
//!
//! Some proposers serialize structured payloads as JSON strings. This module
//! holds the single conversion that turns such strings back into mappings or
//! sequences; everything else passes through untouched.

use serde_json::Value;

/// Parse string payloads that look like a JSON object or array
///
/// A string is a candidate when, after trimming, it starts with `{` and ends
/// with `}` or starts with `[` and ends with `]`. Candidates that fail to
/// parse, and non-string values, are returned unchanged.
#[must_use]
pub fn normalize_payload(value: Value) -> Value {
    let Value::String(text) = &value else {
        return value;
    };

    let trimmed = text.trim();
    let bracketed = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if !bracketed {
        return value;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(parsed @ (Value::Object(_) | Value::Array(_))) => parsed,
        Ok(_) | Err(_) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_object_strings() {
        let raw = json!(r#"{"name": "Payment", "attributes": ["amount"]}"#);
        assert_eq!(
            normalize_payload(raw),
            json!({"name": "Payment", "attributes": ["amount"]})
        );
    }

    #[test]
    fn parses_array_strings_with_whitespace() {
        assert_eq!(normalize_payload(json!("  [\"a\", \"b\"]\n")), json!(["a", "b"]));
    }

    #[test]
    fn keeps_invalid_json_as_string() {
        let raw = json!("{not json}");
        assert_eq!(normalize_payload(raw.clone()), raw);
    }

    #[test]
    fn keeps_plain_strings() {
        assert_eq!(normalize_payload(json!("User")), json!("User"));
        assert_eq!(normalize_payload(json!("{ unbalanced")), json!("{ unbalanced"));
        assert_eq!(normalize_payload(json!("[x}")), json!("[x}"));
    }

    #[test]
    fn leaves_structured_values_alone() {
        assert_eq!(normalize_payload(json!({"a": 1})), json!({"a": 1}));
        assert_eq!(normalize_payload(json!(3)), json!(3));
    }
}
