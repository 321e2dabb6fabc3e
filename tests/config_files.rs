//! Booting a router from files on disk
//!
//! Config loading, fixture resolution and conversation history across a
//! run of queries.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use docroute::config::{BackendConfig, Config};
use docroute::memory::{ConversationMemory, DigestSummarizer, SUMMARY_USER};
use docroute::query::{PageSpec, QuerySpec};
use docroute::router::QueryRouter;
use docroute::session::{QuerySession, SessionReply};

const FIXTURE: &str = r#"{
    "library": {
        "books": [
            {"_id": "b1", "title": "Deep Water", "author_id": "a1"},
            {"_id": "b2", "title": "Dry Land", "author_id": "a2"}
        ],
        "authors": [
            {"_id": "a1", "name": "Mira"},
            {"_id": "a2", "name": "Oskar"}
        ]
    }
}"#;

const CONFIG: &str = r#"{
    "backend": {"kind": "memory", "fixture": "fixture.json"},
    "relationships": {"books": {"via": "author_id", "related_to": "authors"}},
    "router": {"max_concurrency": 2, "collection_timeout_ms": 5000},
    "memory": {"summary_interval": 3}
}"#;

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

async fn boot(dir: &TempDir) -> (Config, QueryRouter) {
    write(dir.path(), "fixture.json", FIXTURE);
    let path = write(dir.path(), "docroute.json", CONFIG);

    let config = Config::load(&path).unwrap();
    let store = config.backend.connect().await.unwrap();
    let router = QueryRouter::new(store, config.relationships.clone(), config.router.options());
    (config, router)
}

// =============================================================================
// Loading
// =============================================================================

#[tokio::test]
async fn fixture_path_is_relative_to_config_file() {
    let dir = TempDir::new().unwrap();
    let (config, _) = boot(&dir).await;

    assert_eq!(
        config.backend,
        BackendConfig::Memory {
            fixture: Some(dir.path().join("fixture.json"))
        }
    );
    assert_eq!(config.router.max_concurrency, 2);
    assert_eq!(config.memory.summary_interval, 3);
}

#[tokio::test]
async fn configured_relationships_join_related_documents() {
    let dir = TempDir::new().unwrap();
    let (_, router) = boot(&dir).await;

    let spec = QuerySpec::parse(r#"{"database": "library", "filter": {"title": "water"}}"#).unwrap();
    let rows = router
        .route(&spec, PageSpec::first())
        .await
        .unwrap()
        .into_documents();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id(), Some("b1"));
    assert_eq!(
        rows[0].get("authors_data"),
        Some(&json!(r#"{"_id":"a1","name":"Mira"}"#))
    );
}

#[test]
fn missing_config_file_is_read_error() {
    let dir = TempDir::new().unwrap();
    let err = Config::load(&dir.path().join("absent.json")).unwrap_err();
    assert_eq!(err.code(), "DOCROUTE_CONFIG_READ");
}

#[tokio::test]
async fn malformed_fixture_fails_to_connect() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "fixture.json", "{\"library\": [1, 2]}");
    let path = write(dir.path(), "docroute.json", CONFIG);

    let config = Config::load(&path).unwrap();
    let err = config.backend.connect().await.unwrap_err();
    assert_eq!(err.code(), "DOCROUTE_STORE_FIXTURE");
}

// =============================================================================
// Session history
// =============================================================================

#[tokio::test]
async fn session_summarizes_every_interval() {
    let dir = TempDir::new().unwrap();
    let (config, router) = boot(&dir).await;
    let memory = ConversationMemory::new(Arc::new(DigestSummarizer), config.memory.summary_interval);
    let session = QuerySession::new(router, Arc::new(memory));

    let found = session
        .run(r#"{"database": "library"}"#, PageSpec::first(), Some("everything"))
        .await;
    assert!(matches!(found, SessionReply::Documents { ref rows, .. } if rows.len() == 4));

    let rejected = session.run(r#"{"filter": {}}"#, PageSpec::first(), None).await;
    assert!(matches!(rejected, SessionReply::Rejected { code: "DOCROUTE_INVALID_QUERY", .. }));

    let empty = session
        .run(r#"{"database": "library", "filter": {"title": "zzz"}}"#, PageSpec::first(), Some("zzz"))
        .await;
    assert!(matches!(empty, SessionReply::NoData { .. }));

    let history = session.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].user, "everything");
    assert_eq!(history[1].user, r#"{"filter": {}}"#);
    assert!(!history[2].is_summary);

    let summary = &history[3];
    assert!(summary.is_summary);
    assert_eq!(summary.user, SUMMARY_USER);
    assert_eq!(summary.summary_at, Some(3));
    assert!(summary.bot.starts_with("3 exchanges: everything;"));
}
