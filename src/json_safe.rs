//! The serialization boundary: everything that leaves the server as JSON goes
//! through here, so NaN, infinities and exotic numeric widths never reach a client.

use chrono::DateTime;
use serde::{Serialize, Serializer};
use serde_json::{Number, Value, json};

use crate::table::Cell;

impl From<&Cell> for Value {
    fn from(cell: &Cell) -> Value {
        match cell {
            Cell::Null => Value::Null,
            Cell::Bool(v) => Value::Bool(*v),
            Cell::Int(v) => Value::from(*v),
            Cell::Float(v) => float_value(*v),
            Cell::Text(s) | Cell::Other(s) => Value::String(s.clone()),
            Cell::Timestamp(micros) => timestamp_value(*micros),
            Cell::List(items) => Value::Array(items.iter().map(Value::from).collect()),
            Cell::Record(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, value)| (key.clone(), Value::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Normalize a value of unknown shape into JSON. Total: never fails.
///
/// Accepts table cells as well as already-built JSON. Non-finite floats
/// become `null`, unsigned integers beyond `i64` become floats, and
/// containers are converted element-wise keeping order and keys.
pub fn safe_json_convert(value: impl Into<Value>) -> Value {
    normalize(value.into())
}

fn normalize(value: Value) -> Value {
    match value {
        Value::Number(n) => {
            if n.is_i64() {
                Value::Number(n)
            } else {
                n.as_f64().map_or(Value::Null, float_value)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, normalize(value)))
                .collect(),
        ),
        other => other,
    }
}

/// Serialize a typed response through [`safe_json_convert`]. A value serde
/// cannot represent becomes an error object instead of failing the response.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value)
        .map(safe_json_convert)
        .unwrap_or_else(|err| json!({ "error": format!("response could not be encoded: {err}") }))
}

pub fn float_value(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

fn timestamp_value(micros: i64) -> Value {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1000) as u32;
    match DateTime::from_timestamp(secs, nanos) {
        Some(dt) => Value::String(dt.to_rfc3339()),
        None => Value::from(micros),
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// `serialize_with` helper: two-decimal display precision, `null` when not finite.
pub fn serialize_rounded<S: Serializer>(v: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if v.is_finite() {
        serializer.serialize_f64(round2(*v))
    } else {
        serializer.serialize_none()
    }
}

pub fn serialize_rounded_opt<S: Serializer>(
    v: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match v {
        Some(v) => serialize_rounded(v, serializer),
        None => serializer.serialize_none(),
    }
}
