//! Turning raw oracle text into validated domain values.
//!
//! The flow is the same for both extraction tasks: sanitize the raw text
//! (strip a Markdown code fence if present), parse it as JSON, then walk the
//! value tree field by field, producing a precise error path on the first
//! violation. Validation is manual rather than a plain serde deserialize
//! because the tolerances differ: integer fields accept whole-number floats,
//! enum fields report their full allowed set on mismatch, and list fields
//! default to empty when absent.

pub mod plan;
pub mod profile;

pub use plan::extract_plan;
pub use profile::extract_profile;

use serde_json::Value;
use thiserror::Error;

/// Failure while converting oracle output into a domain value.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The sanitized text is not parseable JSON at all.
    #[error("oracle response is not valid JSON: {0}")]
    Malformed(String),

    /// The JSON parsed but violates the expected schema.
    #[error("schema violation at `{path}`: {reason}")]
    Schema {
        /// Dotted path to the offending field, e.g. `daily_plans[2].meals[0].meal_time`.
        path: String,
        /// What was wrong with the value found there.
        reason: String,
    },
}

impl ExtractError {
    /// Shorthand for a schema violation.
    pub(crate) fn schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Strip a surrounding Markdown code fence from oracle output.
///
/// Handles a leading ```` ``` ```` with an optional language tag (e.g.
/// ```` ```json ````) and a trailing ```` ``` ````, then trims whitespace.
/// Text without fences passes through trimmed. Idempotent: sanitizing
/// already-sanitized text is a no-op.
pub fn sanitize_response(raw: &str) -> String {
    let trimmed = raw.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_owned();
    };

    // Drop the language tag: everything up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim().to_owned()
}

/// Sanitize and parse oracle output as a JSON object.
pub(crate) fn parse_object(raw: &str) -> Result<serde_json::Map<String, Value>, ExtractError> {
    let cleaned = sanitize_response(raw);
    let value: Value =
        serde_json::from_str(&cleaned).map_err(|e| ExtractError::Malformed(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ExtractError::schema(
            "$",
            format!("expected a JSON object, found {}", type_name(&other)),
        )),
    }
}

// ---------------------------------------------------------------------------
// Value-tree field helpers
// ---------------------------------------------------------------------------

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn missing(path: &str) -> ExtractError {
    ExtractError::schema(path, "required field is missing")
}

/// Required string field.
pub(crate) fn require_str(
    map: &serde_json::Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<String, ExtractError> {
    let full = join(path, key);
    match map.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ExtractError::schema(
            full,
            format!("expected a string, found {}", type_name(other)),
        )),
        None => Err(missing(&full)),
    }
}

/// Required non-negative integer field.
///
/// A float with an exact whole-number value (e.g. `30.0`) is accepted and
/// coerced; any fractional part is rejected.
pub(crate) fn require_u32(
    map: &serde_json::Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<u32, ExtractError> {
    let full = join(path, key);
    let value = map.get(key).ok_or_else(|| missing(&full))?;
    coerce_u32(value, &full)
}

pub(crate) fn coerce_u32(value: &Value, full: &str) -> Result<u32, ExtractError> {
    let Value::Number(num) = value else {
        return Err(ExtractError::schema(
            full,
            format!("expected an integer, found {}", type_name(value)),
        ));
    };
    if let Some(n) = num.as_u64() {
        return u32::try_from(n)
            .map_err(|_| ExtractError::schema(full, format!("value {n} is out of range")));
    }
    if let Some(f) = num.as_f64() {
        if f.fract() == 0.0 && f >= 0.0 && f <= f64::from(u32::MAX) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            return Ok(f as u32);
        }
    }
    Err(ExtractError::schema(
        full,
        format!("expected a whole non-negative number, found {num}"),
    ))
}

/// Required float field. Integers are accepted and widened.
pub(crate) fn require_f64(
    map: &serde_json::Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<f64, ExtractError> {
    let full = join(path, key);
    let value = map.get(key).ok_or_else(|| missing(&full))?;
    coerce_f64(value, &full)
}

pub(crate) fn coerce_f64(value: &Value, full: &str) -> Result<f64, ExtractError> {
    match value {
        Value::Number(num) => num
            .as_f64()
            .ok_or_else(|| ExtractError::schema(full, format!("value {num} is not representable"))),
        other => Err(ExtractError::schema(
            full,
            format!("expected a number, found {}", type_name(other)),
        )),
    }
}

/// Optional float field: absent or `null` yields `None`.
pub(crate) fn optional_f64(
    map: &serde_json::Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<Option<f64>, ExtractError> {
    let full = join(path, key);
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => coerce_f64(value, &full).map(Some),
    }
}

/// Optional string field: absent or `null` yields `None`.
pub(crate) fn optional_str(
    map: &serde_json::Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<Option<String>, ExtractError> {
    let full = join(path, key);
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ExtractError::schema(
            full,
            format!("expected a string or null, found {}", type_name(other)),
        )),
    }
}

/// String-list field defaulting to empty when absent or `null`.
pub(crate) fn string_list(
    map: &serde_json::Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<Vec<String>, ExtractError> {
    let full = join(path, key);
    match map.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(ExtractError::schema(
                    format!("{full}[{i}]"),
                    format!("expected a string, found {}", type_name(other)),
                )),
            })
            .collect(),
        Some(other) => Err(ExtractError::schema(
            full,
            format!("expected an array, found {}", type_name(other)),
        )),
    }
}

/// Required array field.
pub(crate) fn require_array<'a>(
    map: &'a serde_json::Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<&'a Vec<Value>, ExtractError> {
    let full = join(path, key);
    match map.get(key) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(ExtractError::schema(
            full,
            format!("expected an array, found {}", type_name(other)),
        )),
        None => Err(missing(&full)),
    }
}

/// Required object field.
pub(crate) fn require_object<'a>(
    map: &'a serde_json::Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<&'a serde_json::Map<String, Value>, ExtractError> {
    let full = join(path, key);
    match map.get(key) {
        Some(Value::Object(obj)) => Ok(obj),
        Some(other) => Err(ExtractError::schema(
            full,
            format!("expected an object, found {}", type_name(other)),
        )),
        None => Err(missing(&full)),
    }
}

/// Positivity check for measurements that cannot be zero or negative.
pub(crate) fn require_positive(value: f64, path: &str) -> Result<f64, ExtractError> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ExtractError::schema(
            path,
            format!("expected a positive value, found {value}"),
        ))
    }
}

pub(crate) fn join(path: &str, key: &str) -> String {
    if path == "$" {
        format!("$.{key}")
    } else {
        format!("{path}.{key}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_strips_fence_with_language_tag() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(sanitize_response(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_sanitize_strips_bare_fence() {
        let raw = "```\n{\"a\": 1}\n```";
        assert_eq!(sanitize_response(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_sanitize_passes_through_plain_json() {
        assert_eq!(sanitize_response("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let raw = "```json\n{\"a\": 1}\n```";
        let once = sanitize_response(raw);
        assert_eq!(sanitize_response(&once), once);
    }

    #[test]
    fn test_parse_object_rejects_non_json() {
        let err = parse_object("not json at all").unwrap_err();
        assert!(matches!(err, ExtractError::Malformed(_)));
    }

    #[test]
    fn test_parse_object_rejects_top_level_array() {
        let err = parse_object("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ExtractError::Schema { .. }));
    }

    #[test]
    fn test_require_u32_accepts_whole_float() {
        let map = json!({"age": 30.0});
        let map = map.as_object().unwrap();
        assert_eq!(require_u32(map, "$", "age").unwrap(), 30);
    }

    #[test]
    fn test_require_u32_rejects_fractional_float() {
        let map = json!({"age": 30.5});
        let map = map.as_object().unwrap();
        let err = require_u32(map, "$", "age").unwrap_err();
        assert!(err.to_string().contains("$.age"));
    }

    #[test]
    fn test_require_u32_rejects_negative() {
        let map = json!({"age": -3});
        let map = map.as_object().unwrap();
        assert!(require_u32(map, "$", "age").is_err());
    }

    #[test]
    fn test_missing_field_names_path() {
        let map = json!({});
        let map = map.as_object().unwrap();
        let err = require_str(map, "$", "name").unwrap_err();
        assert!(err.to_string().contains("$.name"));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_string_list_defaults_when_absent() {
        let map = json!({});
        let map = map.as_object().unwrap();
        assert!(string_list(map, "$", "allergies").unwrap().is_empty());
    }

    #[test]
    fn test_string_list_rejects_non_string_item() {
        let map = json!({"allergies": ["nuts", 42]});
        let map = map.as_object().unwrap();
        let err = string_list(map, "$", "allergies").unwrap_err();
        assert!(err.to_string().contains("$.allergies[1]"));
    }

    #[test]
    fn test_optional_f64_null_is_none() {
        let map = json!({"target_weight_kg": null});
        let map = map.as_object().unwrap();
        assert_eq!(optional_f64(map, "$", "target_weight_kg").unwrap(), None);
    }
}
