//! docroute - a schema-agnostic query router for document databases
//!
//! A query names a database and either a filter (with optional sort and
//! projection) or an aggregation pipeline. The router searches every
//! collection of that database, learning collection names and field names
//! as it goes, joins configured one-hop relationships, and returns the
//! merged results as flat, portable documents.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use docroute::query::{PageSpec, QuerySpec};
//! use docroute::relationship::RelationshipMap;
//! use docroute::router::{QueryRouter, RouterOptions};
//! use docroute::store::MongoStore;
//!
//! let store = MongoStore::connect("mongodb://localhost:27017", None).await?;
//! let router = QueryRouter::new(Arc::new(store), RelationshipMap::new(), RouterOptions::default());
//! let spec = QuerySpec::parse(r#"{"database": "shop", "filter": {"name": "lamp"}}"#)?;
//! let outcome = router.route(&spec, PageSpec::first()).await?;
//! router.shutdown().await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod executor;
pub mod filter;
pub mod logging;
pub mod memory;
pub mod normalize;
pub mod query;
pub mod relationship;
pub mod router;
pub mod session;
pub mod store;
