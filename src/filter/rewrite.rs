//! Declared-key filter rewrite
//!
//! The precise path: every entry stays on its own key. Text becomes a
//! case-insensitive substring match, lists become set membership, and
//! everything else is passed to the store as written. Entries are ANDed.

use bson::Document;

use crate::query::{Filter, FilterValue};

use super::condition::Condition;

/// Rewrites a filter entry-by-entry on its own keys
pub fn rewrite_filter(filter: &Filter) -> Document {
    let mut out = Document::new();
    for (key, value) in filter.iter() {
        let predicate = match value {
            FilterValue::Text(text) => Condition::contains(key, text).predicate(),
            FilterValue::List(values) => Condition::in_list(key, values.clone()).predicate(),
            FilterValue::Number(n) => (*n).into(),
            FilterValue::Verbatim(v) => v.clone(),
        };
        out.insert(key, predicate);
    }
    out
}
