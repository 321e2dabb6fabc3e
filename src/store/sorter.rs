//! Document sorting for the in-memory backend
//!
//! Multi-key, stable. Missing fields sort as null, i.e. first in ascending
//! order.

use std::cmp::Ordering;

use bson::{Bson, Document};

use super::errors::{StoreError, StoreResult};
use super::values::{compare, lookup_path};

/// Parsed sort specification
#[derive(Debug, Clone)]
pub struct SortOrder {
    keys: Vec<(String, bool)>,
}

impl SortOrder {
    /// Parses `{field: 1 | -1, ...}`
    pub fn parse(spec: &Document) -> StoreResult<Self> {
        let mut keys = Vec::with_capacity(spec.len());
        for (field, direction) in spec {
            let ascending = match direction {
                Bson::Int32(1) | Bson::Int64(1) => true,
                Bson::Int32(-1) | Bson::Int64(-1) => false,
                Bson::Double(d) if *d == 1.0 => true,
                Bson::Double(d) if *d == -1.0 => false,
                other => {
                    return Err(StoreError::invalid(format!(
                        "sort direction for '{}' must be 1 or -1, got {}",
                        field, other
                    )))
                }
            };
            keys.push((field.clone(), ascending));
        }
        Ok(Self { keys })
    }

    pub fn sort(&self, documents: &mut [Document]) {
        documents.sort_by(|a, b| self.compare(a, b));
    }

    fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (field, ascending) in &self.keys {
            let ord = compare(
                lookup_path(a, field).unwrap_or(&Bson::Null),
                lookup_path(b, field).unwrap_or(&Bson::Null),
            );
            let ord = if *ascending { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}
