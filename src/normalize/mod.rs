//! Result normalization
//!
//! Raw documents from different collections carry whatever BSON kinds
//! their writers chose. Before leaving the router every document is
//! flattened into a `ResultDocument`:
//!
//! - `_id` becomes a string (ObjectId as 24-char hex)
//! - Decimal128 becomes a float
//! - nested documents and arrays become compact JSON strings
//! - other non-portable kinds become their canonical string
//! - strings, integers, doubles, booleans and null pass through
//!
//! Normalizing an already-normalized document changes nothing.

mod table;
mod value;

use bson::{Bson, Document};
use serde::Serialize;
use serde_json::{Map, Value};

pub use table::render_table;

/// A flat, portable result row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultDocument {
    fields: Map<String, Value>,
}

impl ResultDocument {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Canonical `_id`, if the raw document had one
    pub fn id(&self) -> Option<&str> {
        self.fields.get("_id").and_then(Value::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.fields
    }

    /// Back to BSON. Every value is a JSON scalar, so this is lossless.
    pub fn to_document(&self) -> Document {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), scalar_to_bson(v)))
            .collect()
    }
}

fn scalar_to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Bson::Int64(i),
            None => Bson::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Bson::String(s.clone()),
        other => Bson::String(other.to_string()),
    }
}

/// Flattens raw documents into `ResultDocument`s
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultNormalizer;

impl ResultNormalizer {
    pub fn normalize(docs: Vec<Document>) -> Vec<ResultDocument> {
        docs.into_iter().map(Self::normalize_one).collect()
    }

    pub fn normalize_one(doc: Document) -> ResultDocument {
        let fields = doc
            .into_iter()
            .map(|(key, value)| {
                let value = if key == "_id" {
                    value::canonical_id(value)
                } else {
                    value::portable(value)
                };
                (key, value)
            })
            .collect();
        ResultDocument { fields }
    }
}
