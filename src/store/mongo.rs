//! MongoDB backend

use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures_util::TryStreamExt;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use tracing::debug;

use super::errors::StoreResult;
use super::{DocumentStore, FindRequest};

/// Store backed by a MongoDB deployment.
///
/// The client is acquired in `connect` and released in `shutdown`.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
}

impl MongoStore {
    /// Parses the URI and builds a client. Connections are opened lazily
    /// by the driver on first use.
    pub async fn connect(uri: &str, app_name: Option<&str>) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        if let Some(name) = app_name {
            options.app_name = Some(name.to_string());
        }
        let client = Client::with_options(options)?;
        debug!(event = "STORE_CONNECTED", backend = "mongodb");
        Ok(Self { client })
    }

    fn collection(&self, database: &str, collection: &str) -> Collection<Document> {
        self.client.database(database).collection(collection)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn list_collections(&self, database: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .client
            .database(database)
            .list_collection_names()
            .await?)
    }

    async fn sample_document(
        &self,
        database: &str,
        collection: &str,
    ) -> StoreResult<Option<Document>> {
        Ok(self.collection(database, collection).find_one(doc! {}).await?)
    }

    async fn find(
        &self,
        database: &str,
        collection: &str,
        request: &FindRequest,
    ) -> StoreResult<Vec<Document>> {
        let coll = self.collection(database, collection);
        let mut action = coll.find(request.filter.clone()).skip(request.skip);
        if let Some(sort) = &request.sort {
            action = action.sort(sort.clone());
        }
        if let Some(projection) = &request.projection {
            action = action.projection(projection.clone());
        }
        if let Some(limit) = request.limit {
            action = action.limit(limit);
        }
        if let Some(max_time) = request.max_time {
            action = action.max_time(max_time);
        }
        let cursor = action.await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_by_id(
        &self,
        database: &str,
        collection: &str,
        id: &Bson,
    ) -> StoreResult<Option<Document>> {
        Ok(self
            .collection(database, collection)
            .find_one(doc! { "_id": id.clone() })
            .await?)
    }

    async fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: Vec<Document>,
        max_time: Option<Duration>,
    ) -> StoreResult<Vec<Document>> {
        let coll = self.collection(database, collection);
        let mut action = coll.aggregate(pipeline);
        if let Some(max_time) = max_time {
            action = action.max_time(max_time);
        }
        let cursor = action.await?;
        Ok(cursor.try_collect().await?)
    }

    async fn shutdown(&self) -> StoreResult<()> {
        self.client.clone().shutdown().await;
        debug!(event = "STORE_SHUTDOWN", backend = "mongodb");
        Ok(())
    }
}
