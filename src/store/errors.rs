//! Store error types
//!
//! Error codes:
//! - DOCROUTE_STORE_DRIVER (backend driver failure)
//! - DOCROUTE_STORE_UNSUPPORTED (operator or stage the backend cannot run)
//! - DOCROUTE_STORE_INVALID (well-formed request the backend rejects)
//! - DOCROUTE_STORE_FIXTURE (fixture file unreadable or malformed)

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Document store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// MongoDB driver error
    #[error("Driver error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// Operator or pipeline stage not implemented by this backend
    #[error("Unsupported {kind}: {name}")]
    Unsupported { kind: &'static str, name: String },

    /// Request rejected, e.g. a bad regex or mixed projection
    #[error("Invalid request: {0}")]
    Invalid(String),

    /// Fixture could not be loaded
    #[error("Fixture error: {0}")]
    Fixture(String),

    /// Filesystem error while loading a fixture
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn unsupported_operator(name: impl Into<String>) -> Self {
        StoreError::Unsupported {
            kind: "operator",
            name: name.into(),
        }
    }

    pub fn unsupported_stage(name: impl Into<String>) -> Self {
        StoreError::Unsupported {
            kind: "stage",
            name: name.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        StoreError::Invalid(reason.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Driver(_) => "DOCROUTE_STORE_DRIVER",
            StoreError::Unsupported { .. } => "DOCROUTE_STORE_UNSUPPORTED",
            StoreError::Invalid(_) => "DOCROUTE_STORE_INVALID",
            StoreError::Fixture(_) | StoreError::Io(_) => "DOCROUTE_STORE_FIXTURE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            StoreError::unsupported_operator("$where").code(),
            "DOCROUTE_STORE_UNSUPPORTED"
        );
        assert_eq!(StoreError::invalid("x").code(), "DOCROUTE_STORE_INVALID");
        assert_eq!(
            StoreError::Fixture("x".into()).code(),
            "DOCROUTE_STORE_FIXTURE"
        );
    }

    #[test]
    fn test_display() {
        let err = StoreError::unsupported_stage("$facet");
        assert_eq!(err.to_string(), "Unsupported stage: $facet");
    }
}
