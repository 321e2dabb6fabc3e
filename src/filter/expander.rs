//! Cross-field filter expansion
//!
//! Used when the router searches collections whose field names it does not
//! know. Each filter value is tried against every discovered field; the
//! filter's own key is ignored. With no known fields the result is
//! match-all.

use crate::catalog::FieldSet;
use crate::query::{Filter, FilterValue};

use super::condition::{Condition, ConditionSet};

/// Expands filters across discovered fields
pub struct FilterExpander;

impl FilterExpander {
    /// Builds the OR-set for one collection
    pub fn expand(filter: &Filter, fields: &FieldSet) -> ConditionSet {
        let mut set = ConditionSet::new();
        for (_key, value) in filter.iter() {
            for field in fields.iter() {
                if let Some(condition) = Self::condition_for(field, value) {
                    set.push(condition);
                }
            }
        }
        set
    }

    fn condition_for(field: &str, value: &FilterValue) -> Option<Condition> {
        match value {
            FilterValue::Text(text) => Some(Condition::contains(field, text)),
            FilterValue::List(values) => Some(Condition::in_list(field, values.clone())),
            FilterValue::Number(n) => Some(Condition::eq(field, *n)),
            FilterValue::Verbatim(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::MatchOperator;
    use bson::{doc, Bson};

    fn fields(names: &[&str]) -> FieldSet {
        FieldSet::new(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_value_searched_against_every_field() {
        let filter = Filter::new().with("x", FilterValue::text("foo"));
        let set = FilterExpander::expand(&filter, &fields(&["name", "tag"]));

        assert_eq!(
            set.to_filter(),
            doc! { "$or": [
                { "name": { "$regex": "foo", "$options": "i" } },
                { "tag": { "$regex": "foo", "$options": "i" } },
            ] }
        );
    }

    #[test]
    fn test_operator_follows_value_kind() {
        let filter = Filter::new()
            .with("a", FilterValue::list(["x", "y"]))
            .with("b", FilterValue::int(7));
        let set = FilterExpander::expand(&filter, &fields(&["f"]));

        let ops: Vec<_> = set.conditions().iter().map(|c| c.operator).collect();
        assert_eq!(ops, vec![MatchOperator::In, MatchOperator::Eq]);
        assert_eq!(set.conditions()[1].operand, Bson::Int64(7));
    }

    #[test]
    fn test_condition_count_is_values_times_fields() {
        let filter = Filter::new()
            .with("a", FilterValue::text("x"))
            .with("b", FilterValue::float(1.5));
        let set = FilterExpander::expand(&filter, &fields(&["f1", "f2", "f3"]));
        assert_eq!(set.len(), 6);
    }

    #[test]
    fn test_no_fields_matches_all() {
        let filter = Filter::new().with("a", FilterValue::text("x"));
        let set = FilterExpander::expand(&filter, &FieldSet::empty());
        assert!(set.is_match_all());
    }

    #[test]
    fn test_verbatim_values_produce_nothing() {
        let filter = Filter::new().with("active", FilterValue::Verbatim(Bson::Boolean(true)));
        let set = FilterExpander::expand(&filter, &fields(&["active"]));
        assert!(set.is_match_all());
    }
}
