//! Query sessions
//!
//! A session turns textual input into a routed answer and reports the
//! exchange to the memory collaborator. Failures become replies; nothing
//! the caller typed can fail a session.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::memory::{HistoryEntry, InteractionRecorder};
use crate::normalize::ResultDocument;
use crate::query::{PageSpec, QuerySpec};
use crate::router::{QueryRouter, QuerySummary, RouteOutcome, RouterError};

/// Answer to one session input
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionReply {
    Documents {
        rows: Vec<ResultDocument>,
        summary: QuerySummary,
    },
    NoData {
        message: String,
        summary: QuerySummary,
    },
    Rejected {
        code: &'static str,
        message: String,
    },
}

impl SessionReply {
    /// Reply as recorded in memory: JSON rows, or the message
    pub fn text(&self) -> String {
        match self {
            SessionReply::Documents { rows, .. } => {
                serde_json::to_string(rows).unwrap_or_else(|e| e.to_string())
            }
            SessionReply::NoData { message, .. } => message.clone(),
            SessionReply::Rejected { message, .. } => message.clone(),
        }
    }

    fn rejected(err: RouterError) -> Self {
        SessionReply::Rejected {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Router plus memory
#[derive(Debug, Clone)]
pub struct QuerySession {
    router: QueryRouter,
    recorder: Arc<dyn InteractionRecorder>,
}

impl QuerySession {
    pub fn new(router: QueryRouter, recorder: Arc<dyn InteractionRecorder>) -> Self {
        Self { router, recorder }
    }

    pub fn router(&self) -> &QueryRouter {
        &self.router
    }

    /// Parses `text` as a query, routes it and records the exchange under
    /// `user_text`, or under `text` when no separate user text is given.
    pub async fn run(&self, text: &str, page: PageSpec, user_text: Option<&str>) -> SessionReply {
        let reply = match QuerySpec::parse(text) {
            Ok(spec) => self.answer(&spec, page).await,
            Err(err) => SessionReply::rejected(err.into()),
        };

        self.recorder
            .record_interaction(user_text.unwrap_or(text), &reply.text());
        reply
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.recorder.history()
    }

    async fn answer(&self, spec: &QuerySpec, page: PageSpec) -> SessionReply {
        match self.router.route_detailed(spec, page).await {
            Ok(report) => match report.outcome {
                RouteOutcome::Documents(rows) => SessionReply::Documents {
                    rows,
                    summary: report.summary,
                },
                RouteOutcome::NoDataFound(reason) => SessionReply::NoData {
                    message: reason.to_string(),
                    summary: report.summary,
                },
            },
            Err(err) => {
                debug!(event = "SESSION_REJECTED", code = err.code(), error = %err);
                SessionReply::rejected(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ConversationMemory;
    use crate::relationship::RelationshipMap;
    use crate::router::RouterOptions;
    use crate::store::MemoryStore;
    use bson::doc;

    fn session() -> (QuerySession, Arc<ConversationMemory>) {
        let store = MemoryStore::new();
        store.insert("shop", "items", doc! { "_id": "i1", "name": "Lamp" });
        let router = QueryRouter::new(
            Arc::new(store),
            RelationshipMap::new(),
            RouterOptions::default(),
        );
        let memory = Arc::new(ConversationMemory::default());
        (QuerySession::new(router, memory.clone()), memory)
    }

    #[tokio::test]
    async fn test_run_records_interaction() {
        let (session, memory) = session();
        let reply = session
            .run(
                r#"{"database": "shop", "filter": {"name": "lamp"}}"#,
                PageSpec::first(),
                Some("find lamps"),
            )
            .await;

        let SessionReply::Documents { rows, .. } = &reply else {
            panic!("expected documents, got {:?}", reply);
        };
        assert_eq!(rows[0].id(), Some("i1"));

        let history = memory.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].user, "find lamps");
        assert_eq!(history[0].bot, r#"[{"_id":"i1","name":"Lamp"}]"#);
    }

    #[tokio::test]
    async fn test_invalid_query_is_a_reply() {
        let (session, memory) = session();
        let reply = session.run(r#"{"filter": {}}"#, PageSpec::first(), None).await;

        assert!(matches!(
            reply,
            SessionReply::Rejected {
                code: "DOCROUTE_INVALID_QUERY",
                ..
            }
        ));
        assert_eq!(memory.history()[0].user, r#"{"filter": {}}"#);
    }

    #[tokio::test]
    async fn test_no_data_message() {
        let (session, _) = session();
        let reply = session
            .run(r#"{"database": "shop", "filter": {"name": "sofa"}}"#, PageSpec::first(), None)
            .await;
        assert_eq!(reply.text(), "no matching data found across collections");
    }
}
