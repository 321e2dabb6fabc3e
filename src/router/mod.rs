//! Query routing across every collection of a database
//!
//! Collections and their fields are discovered per request. Each collection
//! runs in isolation: its failure is logged and recorded in the summary,
//! never returned as a route error. Only an invalid query or an unreadable
//! catalog fails a route.

mod errors;
mod report;
mod router;

pub use errors::{RouterError, RouterResult};
pub use report::{FailedCollection, NoData, QuerySummary, RouteOutcome, RouteReport};
pub use router::{
    QueryRouter, RouterOptions, DEFAULT_COLLECTION_TIMEOUT, DEFAULT_MAX_CONCURRENCY,
};
