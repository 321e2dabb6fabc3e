//! Query description subsystem
//!
//! Parses and validates the caller's request into a `QuerySpec`:
//!
//! - `database` is required and non-empty
//! - the key set is closed; unknown keys are rejected
//! - `aggregation` excludes `filter`, `sort`, `projection` and `match`
//!
//! Pagination is carried separately as a `PageSpec`.

mod errors;
mod page;
mod parser;
mod spec;

pub use errors::{QueryError, QueryResult};
pub use page::{PageSpec, DEFAULT_PAGE_SIZE};
pub use spec::{
    Filter, FilterValue, FindQuery, MatchStrategy, Number, Pipeline, Projection, QueryMode,
    QuerySpec, SortDirection, SortKey,
};
