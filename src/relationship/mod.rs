//! Static one-hop relationships between collections
//!
//! Configured as
//!
//! ```json
//! {"orders": {"via": "customer_id", "related_to": "customers"}}
//! ```
//!
//! meaning each `orders` document links to at most one `customers`
//! document whose `_id` equals its `customer_id`. Joined data is attached
//! under `<related_to>_data`.

mod resolver;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use resolver::RelationshipResolver;

/// Link from a collection to a related collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Field holding the related document's `_id`
    pub via: String,
    /// Related collection name
    pub related_to: String,
}

impl Relationship {
    pub fn new(via: impl Into<String>, related_to: impl Into<String>) -> Self {
        Self {
            via: via.into(),
            related_to: related_to.into(),
        }
    }

    /// Key the joined data is attached under
    pub fn data_key(&self) -> String {
        format!("{}_data", self.related_to)
    }
}

/// Read-only relationship table keyed by source collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipMap {
    links: BTreeMap<String, Relationship>,
}

impl RelationshipMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, collection: impl Into<String>, relationship: Relationship) -> Self {
        self.links.insert(collection.into(), relationship);
        self
    }

    pub fn get(&self, collection: &str) -> Option<&Relationship> {
        self.links.get(collection)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Entries with an empty `via` or `related_to`
    pub fn invalid_entries(&self) -> Vec<&str> {
        self.links
            .iter()
            .filter(|(_, r)| r.via.trim().is_empty() || r.related_to.trim().is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
