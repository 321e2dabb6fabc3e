//! Catalog discovery
//!
//! Nothing about a database is known ahead of a query. Collections are
//! enumerated live and each collection's fields are learned from one
//! sampled document.

mod fields;

use std::sync::Arc;

use tracing::debug;

use crate::store::{DocumentStore, StoreResult};

pub use fields::{FieldDiscoverer, FieldSet};

/// Lists the collections of a database
#[derive(Debug, Clone)]
pub struct CollectionEnumerator {
    store: Arc<dyn DocumentStore>,
}

impl CollectionEnumerator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Collection names in catalog order. The order reflects live state and
    /// is not stable across calls.
    pub async fn list(&self, database: &str) -> StoreResult<Vec<String>> {
        let names = self.store.list_collections(database).await?;
        debug!(
            event = "COLLECTIONS_ENUMERATED",
            database,
            count = names.len()
        );
        Ok(names)
    }
}
