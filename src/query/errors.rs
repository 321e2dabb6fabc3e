//! Query validation errors
//!
//! Every variant here surfaces to the caller as an invalid query. None of
//! them are retried.

use thiserror::Error;

/// Result type for query construction
pub type QueryResult<T> = Result<T, QueryError>;

/// Reasons a query description is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The input text is not a JSON object
    #[error("Malformed query: {0}")]
    Malformed(String),

    /// `database` missing or empty
    #[error("Missing required key: database")]
    MissingDatabase,

    /// Key outside the recognized set
    #[error("Unknown query key: {0}")]
    UnknownKey(String),

    /// `aggregation` combined with filter/sort/projection
    #[error("'aggregation' cannot be combined with '{0}'")]
    ConflictingModes(String),

    /// A filter, sort or projection entry has an unusable value
    #[error("Invalid {section} entry '{key}': {reason}")]
    InvalidEntry {
        section: &'static str,
        key: String,
        reason: String,
    },

    /// An aggregation stage is not a single-operator document
    #[error("Invalid aggregation stage at position {index}: {reason}")]
    InvalidStage { index: usize, reason: String },

    /// Page or page size out of range
    #[error("Invalid page: {0}")]
    InvalidPage(String),
}

impl QueryError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        "DOCROUTE_INVALID_QUERY"
    }

    pub(crate) fn entry(
        section: &'static str,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        QueryError::InvalidEntry {
            section,
            key: key.into(),
            reason: reason.into(),
        }
    }
}
