//! Collection query execution
//!
//! One `CollectionQueryExecutor::execute` call runs one query against one
//! collection. Its failure is a `CollectionError`, scoped to that collection;
//! isolation and concurrency belong to the router.

mod errors;
mod executor;

pub use errors::{CollectionError, CollectionResult, FailureKind};
pub use executor::CollectionQueryExecutor;
