//! Collection query executor
//!
//! Runs one QuerySpec against one collection.
//!
//! Regular mode (strict order):
//! 1. Build the filter for the match strategy
//!    - AnyField: sample the collection's fields, expand across all of them
//!    - DeclaredKey: rewrite each key in place
//! 2. Find with sort, projection, skip and limit
//! 3. Attach related documents
//!
//! Aggregation mode:
//! 1. Copy the base pipeline, prepending the relationship `$lookup`
//! 2. Aggregate; no pagination is added

use std::sync::Arc;
use std::time::Duration;

use bson::{doc, Document};
use tracing::debug;

use crate::catalog::FieldDiscoverer;
use crate::filter::{rewrite_filter, FilterExpander};
use crate::query::{FindQuery, MatchStrategy, PageSpec, Pipeline, QueryMode, QuerySpec};
use crate::relationship::RelationshipResolver;
use crate::store::{DocumentStore, FindRequest, StoreResult};

use super::errors::{CollectionError, CollectionResult};

/// Executes a query against a single collection
#[derive(Debug, Clone)]
pub struct CollectionQueryExecutor {
    store: Arc<dyn DocumentStore>,
    fields: FieldDiscoverer,
    relationships: RelationshipResolver,
    default_strategy: MatchStrategy,
    max_time: Option<Duration>,
}

impl CollectionQueryExecutor {
    pub fn new(store: Arc<dyn DocumentStore>, relationships: RelationshipResolver) -> Self {
        Self {
            fields: FieldDiscoverer::new(Arc::clone(&store)),
            store,
            relationships,
            default_strategy: MatchStrategy::default(),
            max_time: None,
        }
    }

    /// Strategy for queries that do not name one
    pub fn default_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    /// Server-side execution bound passed with every find and aggregate
    pub fn max_time(mut self, max_time: Option<Duration>) -> Self {
        self.max_time = max_time;
        self
    }

    /// Runs `spec` against `collection` and returns its raw batch
    pub async fn execute(
        &self,
        spec: &QuerySpec,
        collection: &str,
        page: PageSpec,
    ) -> CollectionResult<Vec<Document>> {
        let result = match spec.mode() {
            QueryMode::Regular(query) => {
                self.run_find(spec.database(), collection, query, page).await
            }
            QueryMode::Aggregation(pipeline) => {
                self.run_pipeline(spec.database(), collection, pipeline)
                    .await
            }
        };
        result.map_err(|e| CollectionError::new(collection, e))
    }

    /// The filter document sent to the store for a regular query
    pub async fn build_filter(
        &self,
        database: &str,
        collection: &str,
        query: &FindQuery,
    ) -> StoreResult<Document> {
        if query.filter.is_empty() {
            return Ok(doc! {});
        }

        match query.strategy.unwrap_or(self.default_strategy) {
            MatchStrategy::AnyField => {
                let fields = self.fields.discover(database, collection).await?;
                Ok(FilterExpander::expand(&query.filter, &fields).to_filter())
            }
            MatchStrategy::DeclaredKey => Ok(rewrite_filter(&query.filter)),
        }
    }

    async fn run_find(
        &self,
        database: &str,
        collection: &str,
        query: &FindQuery,
        page: PageSpec,
    ) -> StoreResult<Vec<Document>> {
        let filter = self.build_filter(database, collection, query).await?;
        let request = FindRequest::new(filter)
            .sort(query.sort_document())
            .projection(query.projection_document())
            .skip(page.skip())
            .limit(page.limit())
            .max_time(self.max_time);

        let mut docs = self.store.find(database, collection, &request).await?;
        let attached = self
            .relationships
            .attach_related(self.store.as_ref(), database, collection, &mut docs)
            .await?;

        debug!(
            event = "COLLECTION_QUERIED",
            collection,
            mode = "regular",
            returned = docs.len(),
            related = attached
        );
        Ok(docs)
    }

    async fn run_pipeline(
        &self,
        database: &str,
        collection: &str,
        pipeline: &Pipeline,
    ) -> StoreResult<Vec<Document>> {
        let stages = self.relationships.pipeline_for(collection, pipeline);
        let stage_count = stages.len();
        let docs = self
            .store
            .aggregate(database, collection, stages, self.max_time)
            .await?;

        debug!(
            event = "COLLECTION_QUERIED",
            collection,
            mode = "aggregation",
            stages = stage_count,
            returned = docs.len()
        );
        Ok(docs)
    }
}
