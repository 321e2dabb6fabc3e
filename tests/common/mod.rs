//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bson::{Bson, Document};
use serde_json::json;

use docroute::store::{DocumentStore, FindRequest, MemoryStore, StoreError, StoreResult};

/// A small shop: products link to makers, orders link to customers
pub fn shop() -> MemoryStore {
    MemoryStore::from_fixture(json!({
        "shop": {
            "products": [
                {"_id": "p1", "name": "Desk Lamp", "tag": "light", "maker": "m1",
                 "price": {"$numberDecimal": "12.50"}},
                {"_id": "p2", "name": "Sofa", "tag": "lamp-friendly", "maker": "m2"},
                {"_id": "p3", "name": "Table", "tag": "wood", "maker": "m9"}
            ],
            "makers": [
                {"_id": "m1", "name": "Lumen Co"},
                {"_id": "m2", "name": "Comfy Ltd"}
            ],
            "customers": [
                {"_id": "c1", "name": "Ada", "city": "Lampeter"},
                {"_id": "c2", "name": "Grace", "city": "Arlington"}
            ],
            "orders": [
                {"_id": "o1", "customer_id": "c1", "total": 30, "tags": ["gift", "rush"]},
                {"_id": "o2", "customer_id": "c2", "total": 12},
                {"_id": "o3", "customer_id": null, "total": 5}
            ]
        }
    }))
    .expect("shop fixture")
}

/// What a collection does when queried through `FaultyStore`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fault {
    Fail,
    Hang,
    Panic,
    Delay(Duration),
}

/// Counts drops of hung queries
struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Tracks concurrent queries
struct InFlight<'a> {
    current: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(current: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { current }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Wraps a `MemoryStore`, injecting faults per collection and recording
/// every pipeline it is asked to run
#[derive(Debug)]
pub struct FaultyStore {
    inner: MemoryStore,
    faults: HashMap<String, Fault>,
    catalog_down: bool,
    pipelines: Mutex<Vec<(String, Vec<Document>)>>,
    dropped: Arc<AtomicUsize>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            faults: HashMap::new(),
            catalog_down: false,
            pipelines: Mutex::new(Vec::new()),
            dropped: Arc::new(AtomicUsize::new(0)),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn fault(mut self, collection: &str, fault: Fault) -> Self {
        self.faults.insert(collection.to_string(), fault);
        self
    }

    pub fn catalog_down(mut self) -> Self {
        self.catalog_down = true;
        self
    }

    pub fn pipelines(&self) -> Vec<(String, Vec<Document>)> {
        self.pipelines.lock().unwrap().clone()
    }

    /// Hung queries that were dropped before finishing
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Most queries seen running at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn apply(&self, collection: &str) -> StoreResult<()> {
        match self.faults.get(collection) {
            None => Ok(()),
            Some(Fault::Fail) => Err(StoreError::invalid(format!("{} is broken", collection))),
            Some(Fault::Panic) => panic!("{} exploded", collection),
            Some(Fault::Delay(d)) => {
                tokio::time::sleep(*d).await;
                Ok(())
            }
            Some(Fault::Hang) => {
                let _counter = DropCounter(Arc::clone(&self.dropped));
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    fn backend(&self) -> &'static str {
        "faulty"
    }

    async fn list_collections(&self, database: &str) -> StoreResult<Vec<String>> {
        if self.catalog_down {
            return Err(StoreError::invalid("catalog offline"));
        }
        self.inner.list_collections(database).await
    }

    async fn sample_document(
        &self,
        database: &str,
        collection: &str,
    ) -> StoreResult<Option<Document>> {
        self.inner.sample_document(database, collection).await
    }

    async fn find(
        &self,
        database: &str,
        collection: &str,
        request: &FindRequest,
    ) -> StoreResult<Vec<Document>> {
        let _guard = InFlight::enter(&self.in_flight, &self.peak);
        self.apply(collection).await?;
        self.inner.find(database, collection, request).await
    }

    async fn find_by_id(
        &self,
        database: &str,
        collection: &str,
        id: &Bson,
    ) -> StoreResult<Option<Document>> {
        self.inner.find_by_id(database, collection, id).await
    }

    async fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: Vec<Document>,
        max_time: Option<Duration>,
    ) -> StoreResult<Vec<Document>> {
        self.pipelines
            .lock()
            .unwrap()
            .push((collection.to_string(), pipeline.clone()));
        let _guard = InFlight::enter(&self.in_flight, &self.peak);
        self.apply(collection).await?;
        self.inner
            .aggregate(database, collection, pipeline, max_time)
            .await
    }
}
