//! Match conditions
//!
//! A condition targets one field with one operator. A `ConditionSet` ORs
//! its conditions together and renders to a store filter document.

use bson::{doc, Bson, Document};

/// Condition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOperator {
    /// Case-insensitive substring match
    Regex,
    /// Value in list
    In,
    /// Equals
    Eq,
}

impl MatchOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOperator::Regex => "regex",
            MatchOperator::In => "in",
            MatchOperator::Eq => "eq",
        }
    }
}

/// A single field condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: MatchOperator,
    pub operand: Bson,
}

impl Condition {
    /// Case-insensitive substring match on `text`.
    ///
    /// Regex metacharacters in `text` are escaped, so the match is literal.
    pub fn contains(field: impl Into<String>, text: &str) -> Self {
        Self {
            field: field.into(),
            operator: MatchOperator::Regex,
            operand: Bson::String(regex::escape(text)),
        }
    }

    pub fn in_list(field: impl Into<String>, values: Vec<Bson>) -> Self {
        Self {
            field: field.into(),
            operator: MatchOperator::In,
            operand: Bson::Array(values),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self {
            field: field.into(),
            operator: MatchOperator::Eq,
            operand: value.into(),
        }
    }

    /// The value side of `{field: <predicate>}`
    pub fn predicate(&self) -> Bson {
        match self.operator {
            MatchOperator::Regex => Bson::Document(doc! {
                "$regex": self.operand.clone(),
                "$options": "i",
            }),
            MatchOperator::In => Bson::Document(doc! { "$in": self.operand.clone() }),
            MatchOperator::Eq => self.operand.clone(),
        }
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(self.field.clone(), self.predicate());
        doc
    }
}

/// Disjunction of conditions; empty means match-all
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionSet {
    conditions: Vec<Condition>,
}

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn or(mut self, condition: Condition) -> Self {
        self.push(condition);
        self
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_match_all(&self) -> bool {
        self.conditions.is_empty()
    }

    /// `{"$or": [...]}`, or `{}` when there are no conditions
    pub fn to_filter(&self) -> Document {
        if self.conditions.is_empty() {
            return Document::new();
        }
        let branches: Vec<Bson> = self
            .conditions
            .iter()
            .map(|c| Bson::Document(c.to_document()))
            .collect();
        doc! { "$or": branches }
    }
}
