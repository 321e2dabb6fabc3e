//! Per-collection failure types
//!
//! Error code:
//! - DOCROUTE_COLLECTION_FAILED
//!
//! A `CollectionError` never fails a route. The router logs it, records it
//! in the query summary and moves on to the next collection.

use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

/// Why one collection produced no batch
#[derive(Debug, Error)]
pub enum FailureKind {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("task panicked: {0}")]
    Panicked(String),
}

impl FailureKind {
    /// Short label for logs and summaries
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::Store(_) => "store",
            FailureKind::Timeout(_) => "timeout",
            FailureKind::Panicked(_) => "panic",
        }
    }
}

/// Failure of one collection's query
#[derive(Debug, Error)]
#[error("collection '{collection}' failed: {kind}")]
pub struct CollectionError {
    collection: String,
    kind: FailureKind,
}

impl CollectionError {
    pub fn new(collection: impl Into<String>, kind: impl Into<FailureKind>) -> Self {
        Self {
            collection: collection.into(),
            kind: kind.into(),
        }
    }

    pub fn timeout(collection: impl Into<String>, after: Duration) -> Self {
        Self::new(collection, FailureKind::Timeout(after))
    }

    pub fn panicked(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(collection, FailureKind::Panicked(message.into()))
    }

    pub fn code(&self) -> &'static str {
        "DOCROUTE_COLLECTION_FAILED"
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }
}

pub type CollectionResult<T> = Result<T, CollectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = CollectionError::timeout("orders", Duration::from_millis(50));
        assert_eq!(err.code(), "DOCROUTE_COLLECTION_FAILED");
        assert_eq!(err.collection(), "orders");
        assert_eq!(err.kind().label(), "timeout");
    }

    #[test]
    fn test_display_names_collection() {
        let err = CollectionError::new("orders", StoreError::unsupported_stage("$facet"));
        let display = err.to_string();
        assert!(display.contains("orders"));
        assert!(display.contains("$facet"));
        assert_eq!(err.kind().label(), "store");
    }
}
