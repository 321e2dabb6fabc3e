//! Per-value conversion rules

use bson::Bson;
use serde_json::{Number, Value};

/// Canonical string form of any BSON value
pub fn canonical_string(value: Bson) -> String {
    match value {
        Bson::String(s) => s,
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => s,
            Err(_) => Bson::DateTime(dt).into_relaxed_extjson().to_string(),
        },
        other => other.into_relaxed_extjson().to_string(),
    }
}

/// `_id` as a string
pub fn canonical_id(value: Bson) -> Value {
    Value::String(canonical_string(value))
}

/// Portable form of a field value
pub fn portable(value: Bson) -> Value {
    match value {
        Bson::String(s) => Value::String(s),
        Bson::Int32(i) => Value::from(i),
        Bson::Int64(i) => Value::from(i),
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Null => Value::Null,
        Bson::Double(f) => float(f).unwrap_or_else(|| Value::String(f.to_string())),
        Bson::Decimal128(d) => {
            let text = d.to_string();
            text.parse::<f64>()
                .ok()
                .and_then(float)
                .unwrap_or(Value::String(text))
        }
        other => Value::String(canonical_string(other)),
    }
}

fn float(f: f64) -> Option<Value> {
    if !f.is_finite() {
        return None;
    }
    Number::from_f64(f).map(Value::Number)
}
