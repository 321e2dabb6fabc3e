//! Interaction memory
//!
//! The session reports every (input, reply) pair to an
//! `InteractionRecorder`. `ConversationMemory` keeps the full history and
//! folds the recent transcript into a running summary at a fixed interval.

mod conversation;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use conversation::{
    ConversationMemory, DigestSummarizer, Summarizer, DEFAULT_SUMMARY_INTERVAL, SUMMARY_USER,
};

/// One displayed history line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user: String,
    pub bot: String,
    pub is_summary: bool,
    /// Interaction count at which a summary entry was made
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_at: Option<usize>,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn interaction(user: impl Into<String>, bot: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            bot: bot.into(),
            is_summary: false,
            summary_at: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn summary(text: impl Into<String>, at: usize) -> Self {
        Self {
            user: SUMMARY_USER.to_string(),
            bot: text.into(),
            is_summary: true,
            summary_at: Some(at),
            recorded_at: Utc::now(),
        }
    }
}

/// Receives each completed interaction
pub trait InteractionRecorder: Send + Sync + fmt::Debug {
    fn record_interaction(&self, user: &str, bot: &str);

    /// Everything recorded so far, summaries included, oldest first
    fn history(&self) -> Vec<HistoryEntry>;
}
