//! Values exchanged with the host
//!
//! Config, plan and state travel as `serde_json::Value` objects. A value the
//! host cannot know until apply (an attribute computed by another resource)
//! is represented by a fixed marker string.

use serde_json::Value;

/// Marker the host uses for "known after apply"
pub const UNKNOWN: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

pub fn unknown() -> Value {
    Value::String(UNKNOWN.to_string())
}

pub fn is_unknown(value: &Value) -> bool {
    matches!(value, Value::String(s) if s == UNKNOWN)
}

/// True for null and for the unknown marker
pub fn is_null_or_unknown(value: &Value) -> bool {
    value.is_null() || is_unknown(value)
}

/// True when `value` or anything nested in it is unknown
pub fn contains_unknown(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().any(contains_unknown),
        Value::Object(map) => map.values().any(contains_unknown),
        other => is_unknown(other),
    }
}

/// Replace every unknown marker with null; state handed back to the host
/// after apply must be fully known
pub fn resolve_unknowns(value: &mut Value) {
    match value {
        Value::Array(items) => items.iter_mut().for_each(resolve_unknowns),
        Value::Object(map) => map.values_mut().for_each(resolve_unknowns),
        other if is_unknown(other) => *other = Value::Null,
        _ => {}
    }
}

/// Empty in the host's sense: null, "", [] or {}
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
