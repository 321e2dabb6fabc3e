//! Filter translation
//!
//! Two distinct ways of turning a caller filter into a store filter:
//!
//! - `FilterExpander::expand`: cross-field search. Every filter value is
//!   matched against every field discovered in the collection, ORed.
//! - `rewrite_filter`: declared-key match. Each value is matched on its own
//!   key, ANDed.

mod condition;
mod expander;
mod rewrite;

pub use condition::{Condition, ConditionSet, MatchOperator};
pub use expander::FilterExpander;
pub use rewrite::rewrite_filter;
