// ABOUTME: SQLite value conversion to and from JSON
// ABOUTME: Handles all SQLite storage classes with lossless BLOB base64 encoding

use anyhow::{anyhow, bail, Result};
use base64::Engine;
use rusqlite::types::Value;
use serde_json::Value as JsonValue;

/// Marker stored in the `_type` field of an encoded BLOB
pub const BLOB_TYPE_TAG: &str = "blob";

/// Convert a single SQLite value to JSON
///
/// Maps SQLite types to JSON types:
/// - INTEGER → number (i64)
/// - REAL → number (f64), non-finite values become strings
/// - TEXT → string (UTF-8), which is how dates are stored
/// - BLOB → object `{"_type": "blob", "data": "<base64>"}`
/// - NULL → null
///
/// # Examples
///
/// ```
/// # use fam_db_migrator::sqlite::converter::sqlite_value_to_json;
/// # use rusqlite::types::Value;
/// let json = sqlite_value_to_json(&Value::Integer(42)).unwrap();
/// assert_eq!(json, serde_json::json!(42));
/// ```
pub fn sqlite_value_to_json(value: &Value) -> Result<JsonValue> {
    match value {
        Value::Null => Ok(JsonValue::Null),

        Value::Integer(i) => Ok(JsonValue::Number((*i).into())),

        Value::Real(f) => {
            // JSON can't represent NaN or Infinity
            if f.is_finite() {
                serde_json::Number::from_f64(*f)
                    .map(JsonValue::Number)
                    .ok_or_else(|| anyhow!("Failed to convert float {} to JSON number", f))
            } else {
                Ok(JsonValue::String(f.to_string()))
            }
        }

        Value::Text(s) => Ok(JsonValue::String(s.clone())),

        Value::Blob(b) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(b);
            Ok(serde_json::json!({
                "_type": BLOB_TYPE_TAG,
                "data": encoded
            }))
        }
    }
}

/// Convert a JSON value from an export file back into a SQLite value
///
/// The inverse of [`sqlite_value_to_json`]. Booleans (which SQLite never
/// produces, but other sources may) are stored as 0/1. Objects other than
/// the BLOB encoding and arrays are stored as their JSON text.
pub fn json_to_sqlite_value(value: &JsonValue) -> Result<Value> {
    match value {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(b) => Ok(Value::Integer(i64::from(*b))),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Real(f))
            } else {
                bail!("Number {} cannot be represented in SQLite", n)
            }
        }
        JsonValue::String(s) => Ok(Value::Text(s.clone())),
        JsonValue::Object(map) if map.get("_type").and_then(JsonValue::as_str) == Some(BLOB_TYPE_TAG) => {
            let data = map
                .get("data")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| anyhow!("BLOB object is missing its base64 'data' field"))?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(data)
                .map_err(|e| anyhow!("Invalid base64 in BLOB value: {}", e))?;
            Ok(Value::Blob(bytes))
        }
        other => Ok(Value::Text(other.to_string())),
    }
}
