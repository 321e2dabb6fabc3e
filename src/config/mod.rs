//! Configuration
//!
//! Loaded from a JSON file:
//!
//! ```json
//! {
//!   "backend": {"kind": "mongodb", "uri": "mongodb://localhost:27017"},
//!   "relationships": {"orders": {"via": "customer_id", "related_to": "customers"}},
//!   "router": {"max_concurrency": 8, "collection_timeout_ms": 30000},
//!   "logging": {"level": "info", "json": false},
//!   "memory": {"summary_interval": 5}
//! }
//! ```
//!
//! Every section except `backend` may be omitted.

mod errors;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::memory::DEFAULT_SUMMARY_INTERVAL;
use crate::query::{MatchStrategy, DEFAULT_PAGE_SIZE};
use crate::relationship::RelationshipMap;
use crate::router::{RouterOptions, DEFAULT_MAX_CONCURRENCY};
use crate::store::{DocumentStore, MemoryStore, MongoStore, StoreResult};

pub use errors::{ConfigError, ConfigResult};

/// Where documents come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Mongodb {
        uri: String,
        #[serde(default = "default_app_name")]
        app_name: Option<String>,
    },
    /// In-process store loaded from a fixture file
    Memory {
        #[serde(default)]
        fixture: Option<PathBuf>,
    },
}

fn default_app_name() -> Option<String> {
    Some("docroute".to_string())
}

impl BackendConfig {
    /// Builds the configured store
    pub async fn connect(&self) -> StoreResult<Arc<dyn DocumentStore>> {
        let store: Arc<dyn DocumentStore> = match self {
            BackendConfig::Mongodb { uri, app_name } => {
                Arc::new(MongoStore::connect(uri, app_name.as_deref()).await?)
            }
            BackendConfig::Memory { fixture: Some(path) } => {
                Arc::new(MemoryStore::load_fixture(path)?)
            }
            BackendConfig::Memory { fixture: None } => Arc::new(MemoryStore::new()),
        };
        Ok(store)
    }
}

/// Router tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_collection_timeout_ms")]
    pub collection_timeout_ms: u64,

    /// Page size used when a request names none
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    #[serde(default)]
    pub filter_strategy: MatchStrategy,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_collection_timeout_ms() -> u64 {
    30_000
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            collection_timeout_ms: default_collection_timeout_ms(),
            default_page_size: default_page_size(),
            filter_strategy: MatchStrategy::default(),
        }
    }
}

impl RouterConfig {
    pub fn options(&self) -> RouterOptions {
        RouterOptions {
            max_concurrency: self.max_concurrency,
            collection_timeout: Duration::from_millis(self.collection_timeout_ms),
            default_strategy: self.filter_strategy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` overrides it
    #[serde(default = "default_log_level")]
    pub level: String,

    /// One JSON object per line instead of text
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_summary_interval")]
    pub summary_interval: usize,
}

fn default_summary_interval() -> usize {
    DEFAULT_SUMMARY_INTERVAL
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            summary_interval: default_summary_interval(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,

    #[serde(default)]
    pub relationships: RelationshipMap,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Config {
    /// Reads, parses and validates a config file. A relative fixture path
    /// is taken relative to the config file's directory.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_json(&content)?;
        if let BackendConfig::Memory {
            fixture: Some(fixture),
        } = &mut config.backend
        {
            if fixture.is_relative() {
                if let Some(dir) = path.parent() {
                    *fixture = dir.join(&*fixture);
                }
            }
        }
        Ok(config)
    }

    /// Parses and validates config text
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let BackendConfig::Mongodb { uri, .. } = &self.backend {
            if uri.trim().is_empty() {
                return Err(ConfigError::invalid("backend.uri must not be empty"));
            }
        }

        if self.router.max_concurrency == 0 {
            return Err(ConfigError::invalid("router.max_concurrency must be > 0"));
        }
        if self.router.collection_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "router.collection_timeout_ms must be > 0",
            ));
        }
        if self.router.default_page_size == 0 || self.router.default_page_size > i64::MAX as u64
        {
            return Err(ConfigError::invalid(
                "router.default_page_size must be a positive integer",
            ));
        }
        if self.memory.summary_interval == 0 {
            return Err(ConfigError::invalid("memory.summary_interval must be > 0"));
        }

        let broken = self.relationships.invalid_entries();
        if !broken.is_empty() {
            return Err(ConfigError::invalid(format!(
                "relationships need non-empty via and related_to: {}",
                broken.join(", ")
            )));
        }

        Ok(())
    }

    /// Replaces the backend with MongoDB at `uri`
    pub fn override_uri(&mut self, uri: impl Into<String>) {
        let app_name = match &self.backend {
            BackendConfig::Mongodb { app_name, .. } => app_name.clone(),
            BackendConfig::Memory { .. } => default_app_name(),
        };
        self.backend = BackendConfig::Mongodb {
            uri: uri.into(),
            app_name,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config =
            Config::from_json(r#"{"backend": {"kind": "mongodb", "uri": "mongodb://h"}}"#).unwrap();
        assert_eq!(config.router, RouterConfig::default());
        assert_eq!(config.router.default_page_size, 60);
        assert_eq!(config.memory.summary_interval, 5);
        assert_eq!(config.logging.level, "info");
        assert!(config.relationships.is_empty());
        assert_eq!(
            config.backend,
            BackendConfig::Mongodb {
                uri: "mongodb://h".into(),
                app_name: Some("docroute".into())
            }
        );
    }

    #[test]
    fn test_router_options() {
        let config = Config::from_json(
            r#"{
                "backend": {"kind": "memory"},
                "router": {"max_concurrency": 2, "collection_timeout_ms": 250, "filter_strategy": "declared_key"}
            }"#,
        )
        .unwrap();
        let options = config.router.options();
        assert_eq!(options.max_concurrency, 2);
        assert_eq!(options.collection_timeout, Duration::from_millis(250));
        assert_eq!(options.default_strategy, MatchStrategy::DeclaredKey);
    }

    #[test]
    fn test_validation_failures() {
        for text in [
            r#"{"backend": {"kind": "mongodb", "uri": " "}}"#,
            r#"{"backend": {"kind": "memory"}, "router": {"max_concurrency": 0}}"#,
            r#"{"backend": {"kind": "memory"}, "memory": {"summary_interval": 0}}"#,
            r#"{"backend": {"kind": "memory"}, "relationships": {"a": {"via": "", "related_to": "b"}}}"#,
        ] {
            let err = Config::from_json(text).unwrap_err();
            assert_eq!(err.code(), "DOCROUTE_CONFIG_INVALID", "{}", text);
        }
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = Config::from_json(r#"{"backend": {"kind": "redis"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_override_uri() {
        let mut config = Config::from_json(r#"{"backend": {"kind": "memory"}}"#).unwrap();
        config.override_uri("mongodb://other");
        assert!(matches!(config.backend, BackendConfig::Mongodb { ref uri, .. } if uri == "mongodb://other"));
    }
}
