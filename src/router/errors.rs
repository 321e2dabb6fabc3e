//! Router error types
//!
//! Error codes:
//! - DOCROUTE_INVALID_QUERY (request rejected before any collection ran)
//! - DOCROUTE_CATALOG_UNAVAILABLE (collections could not be enumerated)
//!
//! Collection failures are not router errors; see `CollectionError`.

use thiserror::Error;

use crate::query::QueryError;
use crate::store::StoreError;

pub type RouterResult<T> = Result<T, RouterError>;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    #[error("Cannot list collections of '{database}': {source}")]
    CatalogUnavailable {
        database: String,
        #[source]
        source: StoreError,
    },
}

impl RouterError {
    pub fn code(&self) -> &'static str {
        match self {
            RouterError::InvalidQuery(_) => "DOCROUTE_INVALID_QUERY",
            RouterError::CatalogUnavailable { .. } => "DOCROUTE_CATALOG_UNAVAILABLE",
        }
    }
}
