//! CLI error types
//!
//! Subsystem errors keep their own codes. CLI-only codes:
//! - DOCROUTE_CLI_IO (stdin/stdout failure)
//! - DOCROUTE_CLI_INPUT (request line is not valid JSON or names no known op)
//! - DOCROUTE_CLI_CANCELLED (interrupted with Ctrl-C)

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::query::QueryError;
use crate::router::RouterError;
use crate::store::StoreError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error("Invalid query: {0}")]
    Query(#[from] QueryError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Interrupted")]
    Cancelled,

    /// A session reply that refused the request
    #[error("{message}")]
    Rejected {
        code: &'static str,
        message: String,
    },
}

impl CliError {
    pub fn input(reason: impl Into<String>) -> Self {
        CliError::Input(reason.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(e) => e.code(),
            CliError::Store(e) => e.code(),
            CliError::Router(e) => e.code(),
            CliError::Query(e) => e.code(),
            CliError::Io(_) => "DOCROUTE_CLI_IO",
            CliError::Input(_) => "DOCROUTE_CLI_INPUT",
            CliError::Cancelled => "DOCROUTE_CLI_CANCELLED",
            CliError::Rejected { code, .. } => code,
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::input(format!("JSON error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_delegate() {
        let err: CliError = QueryError::MissingDatabase.into();
        assert_eq!(err.code(), "DOCROUTE_INVALID_QUERY");
        assert_eq!(CliError::Cancelled.code(), "DOCROUTE_CLI_CANCELLED");
        assert_eq!(CliError::input("x").code(), "DOCROUTE_CLI_INPUT");
    }
}
