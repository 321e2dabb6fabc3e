//! In-process document store
//!
//! Collections keep insertion order, which is also the order `find`
//! returns without a sort and the order `list_collections` reports.
//! Documents without an `_id` get a fresh ObjectId on insert.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use serde_json::Value;

use super::errors::{StoreError, StoreResult};
use super::matcher::CompiledFilter;
use super::projection::FieldProjection;
use super::sorter::SortOrder;
use super::values::{equals, lookup_path};
use super::{DocumentStore, FindRequest};

#[derive(Debug, Clone)]
struct MemoryCollection {
    name: String,
    documents: Vec<Document>,
}

/// Thread-safe in-memory backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    databases: RwLock<BTreeMap<String, Vec<MemoryCollection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a fixture file: `{"<db>": {"<collection>": [<document>, ...]}}`.
    /// Documents are MongoDB Extended JSON.
    pub fn load_fixture(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| StoreError::Fixture(format!("{}: {}", path.display(), e)))?;
        Self::from_fixture(value)
    }

    /// Builds a store from an already-decoded fixture
    pub fn from_fixture(value: Value) -> StoreResult<Self> {
        let store = Self::new();
        let Value::Object(databases) = value else {
            return Err(StoreError::Fixture(
                "fixture must be an object keyed by database".to_string(),
            ));
        };

        for (database, collections) in databases {
            let Value::Object(collections) = collections else {
                return Err(StoreError::Fixture(format!(
                    "database '{}' must be an object keyed by collection",
                    database
                )));
            };
            for (collection, documents) in collections {
                let Value::Array(documents) = documents else {
                    return Err(StoreError::Fixture(format!(
                        "collection '{}.{}' must be an array",
                        database, collection
                    )));
                };
                store.create_collection(&database, &collection);
                for (index, raw) in documents.into_iter().enumerate() {
                    let doc = match Bson::try_from(raw) {
                        Ok(Bson::Document(doc)) => doc,
                        Ok(_) => {
                            return Err(StoreError::Fixture(format!(
                                "{}.{}[{}] is not a document",
                                database, collection, index
                            )))
                        }
                        Err(e) => {
                            return Err(StoreError::Fixture(format!(
                                "{}.{}[{}]: {}",
                                database, collection, index, e
                            )))
                        }
                    };
                    store.insert(&database, &collection, doc);
                }
            }
        }
        Ok(store)
    }

    /// Creates an empty collection if it does not exist
    pub fn create_collection(&self, database: &str, collection: &str) {
        let mut databases = self.write();
        let collections = databases.entry(database.to_string()).or_default();
        if !collections.iter().any(|c| c.name == collection) {
            collections.push(MemoryCollection {
                name: collection.to_string(),
                documents: Vec::new(),
            });
        }
    }

    /// Inserts one document and returns its `_id`
    pub fn insert(&self, database: &str, collection: &str, doc: Document) -> Bson {
        let doc = if doc.contains_key("_id") {
            doc
        } else {
            let mut with_id = doc! { "_id": ObjectId::new() };
            with_id.extend(doc);
            with_id
        };
        let id = doc.get("_id").cloned().unwrap_or(Bson::Null);

        self.create_collection(database, collection);
        let mut databases = self.write();
        if let Some(target) = databases
            .get_mut(database)
            .and_then(|cs| cs.iter_mut().find(|c| c.name == collection))
        {
            target.documents.push(doc);
        }
        id
    }

    pub fn insert_many<I>(&self, database: &str, collection: &str, docs: I) -> Vec<Bson>
    where
        I: IntoIterator<Item = Document>,
    {
        docs.into_iter()
            .map(|doc| self.insert(database, collection, doc))
            .collect()
    }

    /// Removes a collection; returns whether it existed
    pub fn drop_collection(&self, database: &str, collection: &str) -> bool {
        let mut databases = self.write();
        let Some(collections) = databases.get_mut(database) else {
            return false;
        };
        let before = collections.len();
        collections.retain(|c| c.name != collection);
        collections.len() != before
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Vec<MemoryCollection>>> {
        self.databases.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Vec<MemoryCollection>>> {
        self.databases.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of a collection; a missing collection reads as empty
    fn snapshot(&self, database: &str, collection: &str) -> Vec<Document> {
        self.read()
            .get(database)
            .and_then(|cs| cs.iter().find(|c| c.name == collection))
            .map(|c| c.documents.clone())
            .unwrap_or_default()
    }

    fn run_pipeline(
        &self,
        database: &str,
        mut docs: Vec<Document>,
        pipeline: &[Document],
    ) -> StoreResult<Vec<Document>> {
        for stage in pipeline {
            let Some((op, arg)) = stage.iter().next() else {
                return Err(StoreError::invalid("empty pipeline stage"));
            };
            docs = match op.as_str() {
                "$match" => {
                    let filter = CompiledFilter::compile(document_arg(op, arg)?)?;
                    docs.into_iter().filter(|d| filter.matches(d)).collect()
                }
                "$project" => {
                    let projection = FieldProjection::parse(document_arg(op, arg)?)?;
                    docs.iter().map(|d| projection.apply(d)).collect()
                }
                "$sort" => {
                    SortOrder::parse(document_arg(op, arg)?)?.sort(&mut docs);
                    docs
                }
                "$skip" => {
                    let n = count_arg(op, arg)?;
                    docs.into_iter().skip(n).collect()
                }
                "$limit" => {
                    let n = count_arg(op, arg)?;
                    if n == 0 {
                        return Err(StoreError::invalid("$limit must be positive"));
                    }
                    docs.truncate(n);
                    docs
                }
                "$lookup" => self.lookup(database, docs, document_arg(op, arg)?)?,
                "$count" => {
                    let Bson::String(field) = arg else {
                        return Err(StoreError::invalid("$count expects a field name"));
                    };
                    if docs.is_empty() {
                        Vec::new()
                    } else {
                        let mut out = Document::new();
                        out.insert(field.clone(), Bson::Int64(docs.len() as i64));
                        vec![out]
                    }
                }
                other => return Err(StoreError::unsupported_stage(other)),
            };
        }
        Ok(docs)
    }

    fn lookup(
        &self,
        database: &str,
        docs: Vec<Document>,
        spec: &Document,
    ) -> StoreResult<Vec<Document>> {
        let field = |name: &str| {
            spec.get_str(name)
                .map_err(|_| StoreError::unsupported_stage(format!("$lookup without '{}'", name)))
        };
        let from = field("from")?;
        let local_field = field("localField")?;
        let foreign_field = field("foreignField")?;
        let target = field("as")?;

        let foreign = self.snapshot(database, from);
        Ok(docs
            .into_iter()
            .map(|mut doc| {
                let local = lookup_path(&doc, local_field).cloned().unwrap_or(Bson::Null);
                let joined: Vec<Bson> = foreign
                    .iter()
                    .filter(|f| {
                        let value = lookup_path(f, foreign_field).unwrap_or(&Bson::Null);
                        join_matches(&local, value)
                    })
                    .cloned()
                    .map(Bson::Document)
                    .collect();
                doc.insert(target, joined);
                doc
            })
            .collect())
    }
}

fn join_matches(local: &Bson, foreign: &Bson) -> bool {
    let contains = |items: &[Bson], v: &Bson| items.iter().any(|i| equals(i, v));
    equals(local, foreign)
        || matches!(local, Bson::Array(items) if contains(items, foreign))
        || matches!(foreign, Bson::Array(items) if contains(items, local))
}

fn document_arg<'a>(op: &str, arg: &'a Bson) -> StoreResult<&'a Document> {
    match arg {
        Bson::Document(doc) => Ok(doc),
        _ => Err(StoreError::invalid(format!("{} expects a document", op))),
    }
}

fn count_arg(op: &str, arg: &Bson) -> StoreResult<usize> {
    let n = match arg {
        Bson::Int32(i) => i64::from(*i),
        Bson::Int64(i) => *i,
        Bson::Double(d) if d.fract() == 0.0 => *d as i64,
        _ => return Err(StoreError::invalid(format!("{} expects an integer", op))),
    };
    usize::try_from(n).map_err(|_| StoreError::invalid(format!("{} must not be negative", op)))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list_collections(&self, database: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .read()
            .get(database)
            .map(|cs| cs.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default())
    }

    async fn sample_document(
        &self,
        database: &str,
        collection: &str,
    ) -> StoreResult<Option<Document>> {
        Ok(self
            .read()
            .get(database)
            .and_then(|cs| cs.iter().find(|c| c.name == collection))
            .and_then(|c| c.documents.first().cloned()))
    }

    async fn find(
        &self,
        database: &str,
        collection: &str,
        request: &FindRequest,
    ) -> StoreResult<Vec<Document>> {
        let filter = CompiledFilter::compile(&request.filter)?;
        let sort = request.sort.as_ref().map(SortOrder::parse).transpose()?;
        let projection = request
            .projection
            .as_ref()
            .map(FieldProjection::parse)
            .transpose()?;

        let mut docs: Vec<Document> = self
            .snapshot(database, collection)
            .into_iter()
            .filter(|d| filter.matches(d))
            .collect();

        if let Some(sort) = sort {
            sort.sort(&mut docs);
        }

        let skip = usize::try_from(request.skip).unwrap_or(usize::MAX);
        let limit = match request.limit {
            Some(0) | None => usize::MAX,
            Some(n) => usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX),
        };

        Ok(docs
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|d| match &projection {
                Some(p) => p.apply(&d),
                None => d,
            })
            .collect())
    }

    async fn find_by_id(
        &self,
        database: &str,
        collection: &str,
        id: &Bson,
    ) -> StoreResult<Option<Document>> {
        Ok(self
            .snapshot(database, collection)
            .into_iter()
            .find(|d| d.get("_id").is_some_and(|v| equals(v, id))))
    }

    async fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: Vec<Document>,
        _max_time: Option<Duration>,
    ) -> StoreResult<Vec<Document>> {
        let docs = self.snapshot(database, collection);
        self.run_pipeline(database, docs, &pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shop() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_many(
            "shop",
            "products",
            vec![
                doc! { "_id": 1, "name": "Desk Lamp", "price": 30, "maker": 10 },
                doc! { "_id": 2, "name": "Floor Lamp", "price": 80, "maker": 11 },
                doc! { "_id": 3, "name": "Chair", "price": 55, "maker": 10 },
            ],
        );
        store.insert_many(
            "shop",
            "makers",
            vec![doc! { "_id": 10, "name": "Acme" }, doc! { "_id": 11, "name": "Lumen" }],
        );
        store
    }

    #[tokio::test]
    async fn test_list_collections_in_creation_order() {
        let store = shop();
        store.create_collection("shop", "empty");
        assert_eq!(
            store.list_collections("shop").await.unwrap(),
            vec!["products", "makers", "empty"]
        );
        assert!(store.list_collections("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_assigns_object_id_first() {
        let store = MemoryStore::new();
        let id = store.insert("db", "c", doc! { "a": 1 });
        assert!(matches!(id, Bson::ObjectId(_)));

        let sample = store.sample_document("db", "c").await.unwrap().unwrap();
        assert_eq!(sample.keys().next().map(String::as_str), Some("_id"));
    }

    #[tokio::test]
    async fn test_find_with_sort_skip_limit_projection() {
        let store = shop();
        let request = FindRequest::new(doc! { "name": { "$regex": "lamp", "$options": "i" } })
            .sort(Some(doc! { "price": -1 }))
            .projection(Some(doc! { "name": 1 }))
            .skip(0)
            .limit(1);

        let docs = store.find("shop", "products", &request).await.unwrap();
        assert_eq!(docs, vec![doc! { "_id": 2, "name": "Floor Lamp" }]);
    }

    #[tokio::test]
    async fn test_find_unknown_operator_fails() {
        let store = shop();
        let request = FindRequest::new(doc! { "$where": "1 == 1" });
        let err = store.find("shop", "products", &request).await.unwrap_err();
        assert_eq!(err.code(), "DOCROUTE_STORE_UNSUPPORTED");
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let store = shop();
        let found = store
            .find_by_id("shop", "makers", &Bson::Int64(11))
            .await
            .unwrap();
        assert_eq!(found, Some(doc! { "_id": 11, "name": "Lumen" }));
        assert!(store
            .find_by_id("shop", "makers", &Bson::Int32(99))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_aggregate_match_lookup_sort() {
        let store = shop();
        let pipeline = vec![
            doc! { "$lookup": {
                "from": "makers",
                "localField": "maker",
                "foreignField": "_id",
                "as": "makers_data",
            } },
            doc! { "$match": { "price": { "$gte": 50 } } },
            doc! { "$sort": { "price": 1 } },
            doc! { "$project": { "name": 1, "makers_data": 1, "_id": 0 } },
        ];
        let docs = store
            .aggregate("shop", "products", pipeline, None)
            .await
            .unwrap();

        assert_eq!(
            docs,
            vec![
                doc! { "name": "Chair", "makers_data": [ { "_id": 10, "name": "Acme" } ] },
                doc! { "name": "Floor Lamp", "makers_data": [ { "_id": 11, "name": "Lumen" } ] },
            ]
        );
    }

    #[tokio::test]
    async fn test_aggregate_skip_limit_count() {
        let store = shop();
        let docs = store
            .aggregate(
                "shop",
                "products",
                vec![doc! { "$skip": 1 }, doc! { "$limit": 5 }, doc! { "$count": "n" }],
                None,
            )
            .await
            .unwrap();
        assert_eq!(docs, vec![doc! { "n": 2_i64 }]);
    }

    #[tokio::test]
    async fn test_aggregate_unknown_stage() {
        let store = shop();
        let err = store
            .aggregate("shop", "products", vec![doc! { "$facet": {} }], None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unsupported { kind: "stage", .. }));
    }

    #[tokio::test]
    async fn test_fixture_loading() {
        let store = MemoryStore::from_fixture(json!({
            "shop": {
                "products": [
                    {"_id": {"$oid": "65a1b2c3d4e5f60718293a4b"}, "price": {"$numberDecimal": "12.50"}}
                ],
                "empty": []
            }
        }))
        .unwrap();

        assert_eq!(
            store.list_collections("shop").await.unwrap(),
            vec!["products", "empty"]
        );
        let doc = store.sample_document("shop", "products").await.unwrap().unwrap();
        assert!(matches!(doc.get("_id"), Some(Bson::ObjectId(_))));
        assert!(matches!(doc.get("price"), Some(Bson::Decimal128(_))));
    }

    #[test]
    fn test_fixture_shape_errors() {
        assert!(MemoryStore::from_fixture(json!([1])).is_err());
        assert!(MemoryStore::from_fixture(json!({"db": {"c": {}}})).is_err());
        assert!(MemoryStore::from_fixture(json!({"db": {"c": [1]}})).is_err());
    }

    #[test]
    fn test_drop_collection() {
        let store = shop();
        assert!(store.drop_collection("shop", "makers"));
        assert!(!store.drop_collection("shop", "makers"));
    }
}
