//! Relationship resolution for both query modes

use std::sync::Arc;

use bson::{doc, Bson, Document};
use tracing::trace;

use crate::query::Pipeline;
use crate::store::{lookup_path, DocumentStore, StoreResult};

use super::RelationshipMap;

/// Applies the relationship map to pipelines and result batches
#[derive(Debug, Clone)]
pub struct RelationshipResolver {
    map: Arc<RelationshipMap>,
}

impl RelationshipResolver {
    pub fn new(map: Arc<RelationshipMap>) -> Self {
        Self { map }
    }

    /// Collection-local copy of `base`, with a `$lookup` stage in front when
    /// the collection has a relationship. `base` itself is never touched, so
    /// stages cannot pile up across collections.
    pub fn pipeline_for(&self, collection: &str, base: &Pipeline) -> Vec<Document> {
        let mut stages = base.to_vec();
        if let Some(rel) = self.map.get(collection) {
            stages.insert(
                0,
                doc! {
                    "$lookup": {
                        "from": rel.related_to.as_str(),
                        "localField": rel.via.as_str(),
                        "foreignField": "_id",
                        "as": rel.data_key(),
                    }
                },
            );
        }
        stages
    }

    /// Attaches the related document to each result of a mapped collection.
    ///
    /// Documents whose link value is missing or falsy, or points at
    /// nothing, are left without the data key.
    pub async fn attach_related(
        &self,
        store: &dyn DocumentStore,
        database: &str,
        collection: &str,
        docs: &mut [Document],
    ) -> StoreResult<usize> {
        let Some(rel) = self.map.get(collection) else {
            return Ok(0);
        };
        let key = rel.data_key();

        let mut attached = 0;
        for doc in docs.iter_mut() {
            let Some(link) = lookup_path(doc, &rel.via).filter(|v| is_link(v)).cloned() else {
                continue;
            };
            match store.find_by_id(database, &rel.related_to, &link).await? {
                Some(related) => {
                    doc.insert(key.clone(), related);
                    attached += 1;
                }
                None => trace!(
                    event = "RELATED_NOT_FOUND",
                    collection,
                    related = rel.related_to.as_str(),
                    link = %link
                ),
            }
        }
        Ok(attached)
    }
}

/// Falsy link values (null, zero, false, empty string, array or document)
/// never point at a related document
fn is_link(value: &Bson) -> bool {
    match value {
        Bson::Null | Bson::Undefined => false,
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(f) => *f != 0.0 && !f.is_nan(),
        Bson::String(s) => !s.is_empty(),
        Bson::Array(items) => !items.is_empty(),
        Bson::Document(doc) => !doc.is_empty(),
        _ => true,
    }
}
