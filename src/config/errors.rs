//! Configuration error types
//!
//! Error codes:
//! - DOCROUTE_CONFIG_READ (file missing or unreadable)
//! - DOCROUTE_CONFIG_INVALID (bad JSON or a value out of range)

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        ConfigError::Invalid(reason.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "DOCROUTE_CONFIG_READ",
            ConfigError::Parse(_) | ConfigError::Invalid(_) => "DOCROUTE_CONFIG_INVALID",
        }
    }
}
