//! Query router
//!
//! Route flow (strict order):
//! 1. Validate the database name
//! 2. Enumerate collections; none means no data
//! 3. Run every collection as its own task, bounded by a semaphore and a
//!    per-collection timeout
//! 4. Log and skip failed collections
//! 5. Merge batches in enumeration order, then normalize

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bson::Document;
use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::catalog::CollectionEnumerator;
use crate::executor::{CollectionError, CollectionQueryExecutor, CollectionResult};
use crate::normalize::ResultNormalizer;
use crate::query::{MatchStrategy, PageSpec, QueryError, QuerySpec};
use crate::relationship::{RelationshipMap, RelationshipResolver};
use crate::store::{DocumentStore, StoreResult};

use super::errors::{RouterError, RouterResult};
use super::report::{FailedCollection, NoData, QuerySummary, RouteOutcome, RouteReport};

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;
pub const DEFAULT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Router tuning
#[derive(Debug, Clone, PartialEq)]
pub struct RouterOptions {
    /// Collections queried at once
    pub max_concurrency: usize,
    /// Bound on one collection's execution; also sent to the server
    pub collection_timeout: Duration,
    /// Strategy for queries without a `match` key
    pub default_strategy: MatchStrategy,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            collection_timeout: DEFAULT_COLLECTION_TIMEOUT,
            default_strategy: MatchStrategy::AnyField,
        }
    }
}

/// Searches every collection of a database and merges the results
#[derive(Debug, Clone)]
pub struct QueryRouter {
    store: Arc<dyn DocumentStore>,
    catalog: CollectionEnumerator,
    executor: CollectionQueryExecutor,
    options: RouterOptions,
}

impl QueryRouter {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        relationships: RelationshipMap,
        options: RouterOptions,
    ) -> Self {
        let resolver = RelationshipResolver::new(Arc::new(relationships));
        let executor = CollectionQueryExecutor::new(Arc::clone(&store), resolver)
            .default_strategy(options.default_strategy)
            .max_time(Some(options.collection_timeout));

        Self {
            catalog: CollectionEnumerator::new(Arc::clone(&store)),
            store,
            executor,
            options,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Runs `spec` across all collections
    pub async fn route(&self, spec: &QuerySpec, page: PageSpec) -> RouterResult<RouteOutcome> {
        Ok(self.route_detailed(spec, page).await?.outcome)
    }

    /// Like `route`, with a summary of what each collection did
    pub async fn route_detailed(
        &self,
        spec: &QuerySpec,
        page: PageSpec,
    ) -> RouterResult<RouteReport> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "route",
            %request_id,
            database = spec.database(),
            mode = spec.mode().name()
        );
        self.route_inner(spec, page, request_id)
            .instrument(span)
            .await
    }

    /// Releases the store. Routes after shutdown may fail.
    pub async fn shutdown(&self) -> StoreResult<()> {
        self.store.shutdown().await?;
        info!(event = "ROUTER_SHUTDOWN", backend = self.store.backend());
        Ok(())
    }

    async fn route_inner(
        &self,
        spec: &QuerySpec,
        page: PageSpec,
        request_id: Uuid,
    ) -> RouterResult<RouteReport> {
        let started = Instant::now();
        let mut summary = QuerySummary::new(request_id);
        let database = spec.database();

        // Step 1
        if database.trim().is_empty() {
            return Err(QueryError::MissingDatabase.into());
        }

        // Step 2
        let collections =
            self.catalog
                .list(database)
                .await
                .map_err(|source| RouterError::CatalogUnavailable {
                    database: database.to_string(),
                    source,
                })?;
        summary.collections_total = collections.len();

        if collections.is_empty() {
            let reason = NoData::NoCollections {
                database: database.to_string(),
            };
            warn!(event = "ROUTE_NO_COLLECTIONS", database, "{}", reason);
            summary.elapsed_ms = elapsed_ms(started);
            return Ok(RouteReport {
                outcome: RouteOutcome::NoDataFound(reason),
                summary,
            });
        }

        // Steps 3-4
        let batches = self.fan_out(spec, &collections, page, &mut summary).await;

        // Step 5
        let mut merged = Vec::new();
        for batch in batches.into_iter().flatten() {
            if !batch.is_empty() {
                summary.collections_matched += 1;
            }
            merged.extend(batch);
        }
        summary.documents_total = merged.len();
        summary.elapsed_ms = elapsed_ms(started);

        let outcome = if merged.is_empty() {
            RouteOutcome::NoDataFound(NoData::NoMatches)
        } else {
            RouteOutcome::Documents(ResultNormalizer::normalize(merged))
        };

        info!(
            event = "ROUTE_COMPLETE",
            collections = summary.collections_total,
            matched = summary.collections_matched,
            failed = summary.failures.len(),
            documents = summary.documents_total,
            elapsed_ms = summary.elapsed_ms
        );
        Ok(RouteReport { outcome, summary })
    }

    /// One task per collection. Slot `i` of the result holds collection
    /// `i`'s batch, or `None` if it failed.
    async fn fan_out(
        &self,
        spec: &QuerySpec,
        collections: &[String],
        page: PageSpec,
        summary: &mut QuerySummary,
    ) -> Vec<Option<Vec<Document>>> {
        let spec = Arc::new(spec.clone());
        let permits = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));
        let timeout = self.options.collection_timeout;

        // Dropping the set aborts whatever is still running
        let mut tasks = JoinSet::new();
        for (index, collection) in collections.iter().enumerate() {
            let executor = self.executor.clone();
            let spec = Arc::clone(&spec);
            let permits = Arc::clone(&permits);
            let collection = collection.clone();

            tasks.spawn(
                async move {
                    let run = run_collection(
                        executor,
                        spec,
                        collection.clone(),
                        page,
                        permits,
                        timeout,
                    );
                    let result = AssertUnwindSafe(run)
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|payload| {
                            Err(CollectionError::panicked(collection, panic_message(&*payload)))
                        });
                    (index, result)
                }
                .in_current_span(),
            );
        }

        let mut batches = vec![None; collections.len()];
        let mut failures = vec![None; collections.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(docs))) => batches[index] = Some(docs),
                Ok((index, Err(err))) => {
                    warn!(
                        event = "COLLECTION_FAILED",
                        collection = err.collection(),
                        code = err.code(),
                        kind = err.kind().label(),
                        error = %err.kind()
                    );
                    failures[index] = Some(FailedCollection::from(&err));
                }
                Err(join_err) => {
                    error!(event = "COLLECTION_TASK_LOST", error = %join_err);
                }
            }
        }

        summary.failures = collect_failures(collections, &batches, failures);
        batches
    }
}

async fn run_collection(
    executor: CollectionQueryExecutor,
    spec: Arc<QuerySpec>,
    collection: String,
    page: PageSpec,
    permits: Arc<Semaphore>,
    timeout: Duration,
) -> CollectionResult<Vec<Document>> {
    // The semaphore is never closed
    let _permit = permits.acquire_owned().await.ok();

    match tokio::time::timeout(timeout, executor.execute(&spec, &collection, page)).await {
        Ok(result) => result,
        Err(_) => Err(CollectionError::timeout(collection, timeout)),
    }
}

/// Failures in enumeration order. A slot with neither a batch nor a
/// failure belongs to a task that never reported back.
fn collect_failures(
    collections: &[String],
    batches: &[Option<Vec<Document>>],
    failures: Vec<Option<FailedCollection>>,
) -> Vec<FailedCollection> {
    failures
        .into_iter()
        .zip(batches)
        .zip(collections)
        .filter_map(|((failure, batch), collection)| match (failure, batch) {
            (Some(failure), _) => Some(failure),
            (None, None) => Some(FailedCollection::lost(collection)),
            (None, Some(_)) => None,
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
