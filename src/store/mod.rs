//! Document store abstraction
//!
//! The router never talks to a driver directly. It is handed an
//! `Arc<dyn DocumentStore>` at construction and releases it through
//! `shutdown`. Two backends exist:
//!
//! - `MongoStore`: the MongoDB driver
//! - `MemoryStore`: in-process collections, loaded from code or a JSON
//!   fixture; implements the subset of the query language the router uses

mod errors;
mod matcher;
mod memory;
mod mongo;
mod projection;
mod sorter;
mod values;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bson::{Bson, Document};

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use values::lookup_path;

/// A find operation against one collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindRequest {
    pub filter: Document,
    pub sort: Option<Document>,
    pub projection: Option<Document>,
    pub skip: u64,
    pub limit: Option<i64>,
    /// Server-side execution bound
    pub max_time: Option<Duration>,
}

impl FindRequest {
    pub fn new(filter: Document) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn sort(mut self, sort: Option<Document>) -> Self {
        self.sort = sort;
        self
    }

    pub fn projection(mut self, projection: Option<Document>) -> Self {
        self.projection = projection;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn max_time(mut self, max_time: Option<Duration>) -> Self {
        self.max_time = max_time;
        self
    }
}

/// Database handle used by the router
#[async_trait]
pub trait DocumentStore: Send + Sync + fmt::Debug {
    /// Backend name for logs
    fn backend(&self) -> &'static str;

    /// Names of all collections in `database`, in catalog order
    async fn list_collections(&self, database: &str) -> StoreResult<Vec<String>>;

    /// Any one document from the collection, if it has one
    async fn sample_document(
        &self,
        database: &str,
        collection: &str,
    ) -> StoreResult<Option<Document>>;

    async fn find(
        &self,
        database: &str,
        collection: &str,
        request: &FindRequest,
    ) -> StoreResult<Vec<Document>>;

    /// The document whose `_id` equals `id`
    async fn find_by_id(
        &self,
        database: &str,
        collection: &str,
        id: &Bson,
    ) -> StoreResult<Option<Document>>;

    async fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: Vec<Document>,
        max_time: Option<Duration>,
    ) -> StoreResult<Vec<Document>>;

    /// Releases connections. Calls after shutdown may fail.
    async fn shutdown(&self) -> StoreResult<()> {
        Ok(())
    }
}
