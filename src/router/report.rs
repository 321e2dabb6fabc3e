//! Route outcomes and summaries

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::executor::CollectionError;
use crate::normalize::ResultDocument;

/// Why a route produced no documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NoData {
    /// The database has no collections
    NoCollections { database: String },
    /// Every collection returned nothing or failed
    NoMatches,
}

impl fmt::Display for NoData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoData::NoCollections { database } => {
                write!(f, "no collections found in database {}", database)
            }
            NoData::NoMatches => write!(f, "no matching data found across collections"),
        }
    }
}

/// Result of one route call
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Documents(Vec<ResultDocument>),
    NoDataFound(NoData),
}

impl RouteOutcome {
    pub fn documents(&self) -> &[ResultDocument] {
        match self {
            RouteOutcome::Documents(docs) => docs,
            RouteOutcome::NoDataFound(_) => &[],
        }
    }

    pub fn into_documents(self) -> Vec<ResultDocument> {
        match self {
            RouteOutcome::Documents(docs) => docs,
            RouteOutcome::NoDataFound(_) => Vec::new(),
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, RouteOutcome::NoDataFound(_))
    }
}

/// One skipped collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedCollection {
    pub collection: String,
    pub kind: &'static str,
    pub message: String,
}

impl FailedCollection {
    /// A collection whose task ended without reporting a result
    pub fn lost(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            kind: "lost",
            message: "task ended without a result".to_string(),
        }
    }
}

impl From<&CollectionError> for FailedCollection {
    fn from(err: &CollectionError) -> Self {
        Self {
            collection: err.collection().to_string(),
            kind: err.kind().label(),
            message: err.kind().to_string(),
        }
    }
}

/// What happened across the collections of one route call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuerySummary {
    pub request_id: Uuid,
    pub collections_total: usize,
    /// Collections that contributed at least one document
    pub collections_matched: usize,
    pub failures: Vec<FailedCollection>,
    pub documents_total: usize,
    pub elapsed_ms: u64,
}

impl QuerySummary {
    pub(crate) fn new(request_id: Uuid) -> Self {
        Self {
            request_id,
            collections_total: 0,
            collections_matched: 0,
            failures: Vec::new(),
            documents_total: 0,
            elapsed_ms: 0,
        }
    }
}

/// Outcome plus summary
#[derive(Debug, Clone, PartialEq)]
pub struct RouteReport {
    pub outcome: RouteOutcome,
    pub summary: QuerySummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_messages() {
        let reason = NoData::NoCollections {
            database: "shop".into(),
        };
        assert_eq!(reason.to_string(), "no collections found in database shop");
        assert_eq!(
            NoData::NoMatches.to_string(),
            "no matching data found across collections"
        );
    }

    #[test]
    fn test_outcome_documents() {
        let outcome = RouteOutcome::NoDataFound(NoData::NoMatches);
        assert!(outcome.is_no_data());
        assert!(outcome.documents().is_empty());
    }
}
