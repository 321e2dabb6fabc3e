//! Field discovery from a sampled document

use std::sync::Arc;

use bson::Document;
use tracing::{debug, warn};

use crate::store::{DocumentStore, StoreResult};

/// Field names of one sampled document, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    names: Vec<String>,
}

impl FieldSet {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_document(doc: &Document) -> Self {
        Self {
            names: doc.keys().cloned().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Learns a collection's fields by sampling it
#[derive(Debug, Clone)]
pub struct FieldDiscoverer {
    store: Arc<dyn DocumentStore>,
}

impl FieldDiscoverer {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Fields of one sampled document. An empty collection yields an empty
    /// set, which is logged and not treated as an error.
    pub async fn discover(&self, database: &str, collection: &str) -> StoreResult<FieldSet> {
        let fields = match self.store.sample_document(database, collection).await? {
            Some(doc) => FieldSet::from_document(&doc),
            None => FieldSet::empty(),
        };

        if fields.is_empty() {
            warn!(
                event = "FIELDS_UNKNOWN",
                database,
                collection,
                "no sample document; collection will be searched unfiltered"
            );
        } else {
            debug!(
                event = "FIELDS_DISCOVERED",
                database,
                collection,
                fields = ?fields.names
            );
        }
        Ok(fields)
    }
}
