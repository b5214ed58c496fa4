//! Dispatch input shaping.
//!
//! Inputs arrive as a raw JSON string and leave as a map with every
//! semantically-empty entry removed. Only `null` and `""` count as empty;
//! `false`, `0`, and arrays are real values and are always kept.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

static SECRET_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(token|secret|password|passwd|api[_-]?key|credential)").expect("valid secret key pattern"));

/// Error raised when the raw input payload cannot be used.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("invalid client_payload JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("client_payload must be a JSON object, got {kind}")]
    NotAnObject { kind: &'static str },
}

/// Parse the raw payload text into a JSON object.
///
/// Blank input yields an empty map. Anything that is not an object is
/// rejected, since dispatch inputs are a flat key/value mapping.
pub fn parse_payload(raw: &str) -> Result<Map<String, Value>, PayloadError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => Err(PayloadError::NotAnObject {
            kind: value_kind(&other),
        }),
    }
}

/// Return a copy of `payload` without `null`, `""`, or objects that become
/// empty once the same rule is applied to them.
///
/// Idempotent: sanitizing a sanitized map returns it unchanged.
pub fn sanitize_payload(payload: &Map<String, Value>) -> Map<String, Value> {
    let mut cleaned = Map::new();
    for (key, value) in payload {
        match value {
            Value::Null => continue,
            Value::String(text) if text.is_empty() => continue,
            Value::Object(nested) => {
                let nested = sanitize_payload(nested);
                if !nested.is_empty() {
                    cleaned.insert(key.clone(), Value::Object(nested));
                }
            }
            other => {
                cleaned.insert(key.clone(), other.clone());
            }
        }
    }
    cleaned
}

/// Copy of `payload` suitable for logs: values under secret-looking keys are
/// replaced by `<redacted>` at every depth.
pub fn redact_payload(payload: &Map<String, Value>) -> Map<String, Value> {
    payload
        .iter()
        .map(|(key, value)| {
            let shown = match value {
                _ if SECRET_KEY.is_match(key) => Value::String("<redacted>".into()),
                Value::Object(nested) => Value::Object(redact_payload(nested)),
                other => other.clone(),
            };
            (key.clone(), shown)
        })
        .collect()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
