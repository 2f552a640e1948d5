//! Conversion between plain JSON and Firestore's typed value encoding.
//!
//! Firestore REST wraps every value in a single-key object naming its type,
//! e.g. `{"stringValue": "x"}` or `{"mapValue": {"fields": {...}}}`. Integers
//! travel as decimal strings. Timestamps, references and bytes decode to
//! plain strings.

use serde_json::{Map, Number, Value, json};

use crate::stores::{Document, StoreError};

/// Encode document fields into a Firestore `fields` object.
#[must_use]
pub fn encode_fields(fields: &Document) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), encode(value)))
        .collect()
}

/// Decode a Firestore `fields` object into plain document fields.
///
/// # Errors
///
/// Returns `StoreError::Decode` if a value has an unknown or malformed encoding.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Document, StoreError> {
    fields
        .iter()
        .map(|(key, value)| Ok((key.clone(), decode(value)?)))
        .collect()
}

/// Encode a single JSON value.
#[must_use]
pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => n.as_i64().map_or_else(
            || json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
            |i| json!({ "integerValue": i.to_string() }),
        ),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Decode a single Firestore value.
///
/// # Errors
///
/// Returns `StoreError::Decode` if the value has an unknown or malformed encoding.
pub fn decode(value: &Value) -> Result<Value, StoreError> {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Err(StoreError::Decode(format!("not a typed value: {value}")));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| malformed(kind, inner)),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(|i| Value::Number(i.into()))
                .ok_or_else(|| malformed(kind, inner))
        }
        "doubleValue" => {
            let parsed = match inner {
                Value::Number(n) => n.as_f64(),
                // NaN and infinities arrive as strings
                Value::String(s) => s.parse::<f64>().ok(),
                _ => None,
            };
            Ok(parsed
                .and_then(Number::from_f64)
                .map_or(Value::Null, Value::Number))
        }
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_owned()))
            .ok_or_else(|| malformed(kind, inner)),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = match inner.get("values") {
                None => Vec::new(),
                Some(Value::Array(values)) => values.iter().map(decode).collect::<Result<_, _>>()?,
                Some(other) => return Err(malformed(kind, other)),
            };
            Ok(Value::Array(values))
        }
        "mapValue" => match inner.get("fields") {
            None => Ok(Value::Object(Map::new())),
            Some(Value::Object(fields)) => Ok(Value::Object(decode_fields(fields)?)),
            Some(other) => Err(malformed(kind, other)),
        },
        other => Err(StoreError::Decode(format!("unknown value type: {other}"))),
    }
}

/// Quote a field name for use in an update mask when it is not a plain identifier.
#[must_use]
pub fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_owned()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn malformed(kind: &str, inner: &Value) -> StoreError {
    StoreError::Decode(format!("malformed {kind}: {inner}"))
}
