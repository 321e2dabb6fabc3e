//! Rolling conversation memory with periodic summaries

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::{HistoryEntry, InteractionRecorder};

pub const DEFAULT_SUMMARY_INTERVAL: usize = 5;

/// `user` value of summary entries
pub const SUMMARY_USER: &str = "Conversation Summary";

const DIGEST_ITEM_WIDTH: usize = 60;

/// Produces a summary of the pending transcript
pub trait Summarizer: Send + Sync + std::fmt::Debug {
    /// `previous` is the running summary so far (empty at first)
    fn summarize(&self, previous: &str, transcript: &[HistoryEntry]) -> String;
}

/// Deterministic summarizer listing what was asked
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestSummarizer;

impl Summarizer for DigestSummarizer {
    fn summarize(&self, _previous: &str, transcript: &[HistoryEntry]) -> String {
        let asked: Vec<String> = transcript.iter().map(|e| clip(&e.user)).collect();
        format!(
            "{} exchange{}: {}.",
            transcript.len(),
            if transcript.len() == 1 { "" } else { "s" },
            asked.join("; ")
        )
    }
}

fn clip(text: &str) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() <= DIGEST_ITEM_WIDTH {
        return text;
    }
    let mut cut: String = text.chars().take(DIGEST_ITEM_WIDTH - 3).collect();
    cut.push_str("...");
    cut
}

#[derive(Debug, Default)]
struct MemoryState {
    history: Vec<HistoryEntry>,
    pending: Vec<HistoryEntry>,
    summary: String,
    interactions: usize,
}

/// History plus a running summary refreshed every `interval` interactions
#[derive(Debug)]
pub struct ConversationMemory {
    state: Mutex<MemoryState>,
    summarizer: Arc<dyn Summarizer>,
    interval: usize,
}

impl ConversationMemory {
    pub fn new(summarizer: Arc<dyn Summarizer>, interval: usize) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            summarizer,
            interval: interval.max(1),
        }
    }

    pub fn summary(&self) -> String {
        self.lock().summary.clone()
    }

    pub fn interactions(&self) -> usize {
        self.lock().interactions
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(Arc::new(DigestSummarizer), DEFAULT_SUMMARY_INTERVAL)
    }
}

impl InteractionRecorder for ConversationMemory {
    fn record_interaction(&self, user: &str, bot: &str) {
        let mut state = self.lock();
        let entry = HistoryEntry::interaction(user, bot);
        state.history.push(entry.clone());
        state.pending.push(entry);
        state.interactions += 1;

        if state.interactions % self.interval != 0 {
            return;
        }

        let fresh = self.summarizer.summarize(&state.summary, &state.pending);
        let complete = if state.summary.is_empty() {
            fresh
        } else {
            format!("{} {}", state.summary, fresh)
        };
        let at = state.interactions;
        state.history.push(HistoryEntry::summary(complete.clone(), at));
        state.summary = complete;
        state.pending.clear();
        debug!(event = "MEMORY_SUMMARIZED", interactions = at);
    }

    fn history(&self) -> Vec<HistoryEntry> {
        self.lock().history.clone()
    }
}
