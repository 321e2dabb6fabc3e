//! Field projection for the in-memory backend

use bson::{Bson, Document};

use super::errors::{StoreError, StoreResult};

/// Inclusion or exclusion projection
#[derive(Debug, Clone)]
pub struct FieldProjection {
    fields: Vec<String>,
    inclusive: bool,
    keep_id: bool,
}

impl FieldProjection {
    /// Parses `{field: 1|0|true|false}`. Mixing inclusion and exclusion is
    /// rejected, except for `_id`.
    pub fn parse(spec: &Document) -> StoreResult<Self> {
        let mut keep_id = true;
        let mut fields = Vec::new();
        let mut mode: Option<bool> = None;

        for (field, flag) in spec {
            let include = match flag {
                Bson::Boolean(b) => *b,
                Bson::Int32(i) => *i != 0,
                Bson::Int64(i) => *i != 0,
                Bson::Double(d) => *d != 0.0,
                other => {
                    return Err(StoreError::unsupported_operator(format!(
                        "projection expression for '{}': {}",
                        field, other
                    )))
                }
            };
            if field == "_id" {
                keep_id = include;
                continue;
            }
            match mode {
                Some(m) if m != include => {
                    return Err(StoreError::invalid(
                        "projection cannot mix inclusion and exclusion",
                    ))
                }
                _ => mode = Some(include),
            }
            fields.push(field.clone());
        }

        Ok(Self {
            fields,
            inclusive: mode.unwrap_or(false),
            keep_id,
        })
    }

    pub fn apply(&self, doc: &Document) -> Document {
        if self.inclusive {
            let mut out = Document::new();
            if self.keep_id {
                if let Some(id) = doc.get("_id") {
                    out.insert("_id", id.clone());
                }
            }
            for field in &self.fields {
                if let Some(value) = doc.get(field) {
                    out.insert(field.clone(), value.clone());
                }
            }
            out
        } else {
            let mut out = doc.clone();
            if !self.keep_id {
                out.remove("_id");
            }
            for field in &self.fields {
                out.remove(field);
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_inclusion_keeps_id() {
        let p = FieldProjection::parse(&doc! { "name": 1 }).unwrap();
        let out = p.apply(&doc! { "_id": 1, "name": "a", "qty": 2 });
        assert_eq!(out, doc! { "_id": 1, "name": "a" });
    }

    #[test]
    fn test_inclusion_without_id() {
        let p = FieldProjection::parse(&doc! { "name": true, "_id": false }).unwrap();
        let out = p.apply(&doc! { "_id": 1, "name": "a", "qty": 2 });
        assert_eq!(out, doc! { "name": "a" });
    }

    #[test]
    fn test_exclusion() {
        let p = FieldProjection::parse(&doc! { "qty": 0 }).unwrap();
        let out = p.apply(&doc! { "_id": 1, "name": "a", "qty": 2 });
        assert_eq!(out, doc! { "_id": 1, "name": "a" });
    }

    #[test]
    fn test_only_id_excluded() {
        let p = FieldProjection::parse(&doc! { "_id": 0 }).unwrap();
        let out = p.apply(&doc! { "_id": 1, "name": "a" });
        assert_eq!(out, doc! { "name": "a" });
    }

    #[test]
    fn test_mixed_rejected() {
        assert!(FieldProjection::parse(&doc! { "a": 1, "b": 0 }).is_err());
    }
}
