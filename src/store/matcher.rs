//! Filter evaluation for the in-memory backend
//!
//! A filter document is compiled once into a predicate tree and then
//! evaluated per document. Semantics follow the server where it matters to
//! the router:
//!
//! - a missing field never matches, except `{field: null}` and
//!   `{$exists: false}`
//! - array fields match when any element matches
//! - range operators only compare within the same type bracket
//! - regexes only match strings

use std::cmp::Ordering;

use bson::{Bson, Document};
use regex::{Regex, RegexBuilder};

use super::errors::{StoreError, StoreResult};
use super::values::{compare, equals, lookup_path, type_rank};

#[derive(Debug, Clone, Copy)]
enum Bound {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Bound {
    fn holds(self, ord: Ordering) -> bool {
        match self {
            Bound::Gt => ord == Ordering::Greater,
            Bound::Gte => ord != Ordering::Less,
            Bound::Lt => ord == Ordering::Less,
            Bound::Lte => ord != Ordering::Greater,
        }
    }
}

#[derive(Debug)]
enum Candidate {
    Value(Bson),
    Pattern(Regex),
}

#[derive(Debug)]
enum Test {
    Eq(Bson),
    Ne(Bson),
    Range(Bound, Bson),
    In(Vec<Candidate>),
    Nin(Vec<Candidate>),
    Exists(bool),
    Pattern(Regex),
}

#[derive(Debug)]
enum Node {
    And(Vec<Node>),
    Or(Vec<Node>),
    Nor(Vec<Node>),
    Field { path: String, tests: Vec<Test> },
}

/// A compiled filter document
#[derive(Debug)]
pub struct CompiledFilter {
    root: Node,
}

impl CompiledFilter {
    /// Compiles a filter, rejecting unknown operators and bad regexes
    pub fn compile(filter: &Document) -> StoreResult<Self> {
        Ok(Self {
            root: compile_document(filter)?,
        })
    }

    /// True when the filter is `{}`
    pub fn is_match_all(&self) -> bool {
        matches!(&self.root, Node::And(children) if children.is_empty())
    }

    pub fn matches(&self, doc: &Document) -> bool {
        eval(&self.root, doc)
    }
}

fn compile_document(filter: &Document) -> StoreResult<Node> {
    let mut children = Vec::with_capacity(filter.len());
    for (key, value) in filter {
        let node = match key.as_str() {
            "$and" => Node::And(compile_branches(key, value)?),
            "$or" => Node::Or(compile_branches(key, value)?),
            "$nor" => Node::Nor(compile_branches(key, value)?),
            op if op.starts_with('$') => return Err(StoreError::unsupported_operator(op)),
            path => Node::Field {
                path: path.to_string(),
                tests: compile_tests(value)?,
            },
        };
        children.push(node);
    }
    Ok(Node::And(children))
}

fn compile_branches(op: &str, value: &Bson) -> StoreResult<Vec<Node>> {
    let Bson::Array(items) = value else {
        return Err(StoreError::invalid(format!("{} expects an array", op)));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(doc) => compile_document(doc),
            _ => Err(StoreError::invalid(format!(
                "{} entries must be documents",
                op
            ))),
        })
        .collect()
}

fn compile_tests(value: &Bson) -> StoreResult<Vec<Test>> {
    match value {
        Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => {
            compile_operators(ops)
        }
        Bson::RegularExpression(re) => Ok(vec![Test::Pattern(build_regex(
            &re.pattern,
            &re.options,
        )?)]),
        other => Ok(vec![Test::Eq(other.clone())]),
    }
}

fn compile_operators(ops: &Document) -> StoreResult<Vec<Test>> {
    let options = match ops.get("$options") {
        Some(Bson::String(s)) => s.as_str(),
        Some(_) => return Err(StoreError::invalid("$options must be a string")),
        None => "",
    };

    let mut tests = Vec::with_capacity(ops.len());
    for (op, operand) in ops {
        let test = match op.as_str() {
            "$eq" => Test::Eq(operand.clone()),
            "$ne" => Test::Ne(operand.clone()),
            "$gt" => Test::Range(Bound::Gt, operand.clone()),
            "$gte" => Test::Range(Bound::Gte, operand.clone()),
            "$lt" => Test::Range(Bound::Lt, operand.clone()),
            "$lte" => Test::Range(Bound::Lte, operand.clone()),
            "$in" => Test::In(compile_candidates(op, operand)?),
            "$nin" => Test::Nin(compile_candidates(op, operand)?),
            "$exists" => Test::Exists(truthy(operand)),
            "$regex" => Test::Pattern(match operand {
                Bson::String(pattern) => build_regex(pattern, options)?,
                Bson::RegularExpression(re) => build_regex(&re.pattern, &re.options)?,
                _ => return Err(StoreError::invalid("$regex must be a string")),
            }),
            "$options" if ops.contains_key("$regex") => continue,
            "$options" => return Err(StoreError::invalid("$options without $regex")),
            other => return Err(StoreError::unsupported_operator(other)),
        };
        tests.push(test);
    }
    Ok(tests)
}

fn compile_candidates(op: &str, operand: &Bson) -> StoreResult<Vec<Candidate>> {
    let Bson::Array(items) = operand else {
        return Err(StoreError::invalid(format!("{} expects an array", op)));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::RegularExpression(re) => {
                Ok(Candidate::Pattern(build_regex(&re.pattern, &re.options)?))
            }
            other => Ok(Candidate::Value(other.clone())),
        })
        .collect()
}

fn build_regex(pattern: &str, options: &str) -> StoreResult<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in options.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => {
                return Err(StoreError::invalid(format!(
                    "unsupported regex option '{}'",
                    other
                )))
            }
        };
    }
    builder
        .build()
        .map_err(|e| StoreError::invalid(format!("bad regex '{}': {}", pattern, e)))
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null | Bson::Undefined => false,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(d) => *d != 0.0,
        _ => true,
    }
}

fn eval(node: &Node, doc: &Document) -> bool {
    match node {
        Node::And(children) => children.iter().all(|c| eval(c, doc)),
        Node::Or(children) => children.iter().any(|c| eval(c, doc)),
        Node::Nor(children) => !children.iter().any(|c| eval(c, doc)),
        Node::Field { path, tests } => {
            let value = lookup_path(doc, path);
            tests.iter().all(|t| eval_test(t, value))
        }
    }
}

fn eval_test(test: &Test, value: Option<&Bson>) -> bool {
    match test {
        Test::Eq(expected) => eq_match(value, expected),
        Test::Ne(expected) => !eq_match(value, expected),
        Test::Range(bound, operand) => any_element(value, |v| {
            type_rank(v) == type_rank(operand) && bound.holds(compare(v, operand))
        }),
        Test::In(candidates) => in_match(value, candidates),
        Test::Nin(candidates) => !in_match(value, candidates),
        Test::Exists(expected) => value.is_some() == *expected,
        Test::Pattern(re) => any_element(value, |v| matches!(v, Bson::String(s) if re.is_match(s))),
    }
}

fn eq_match(value: Option<&Bson>, expected: &Bson) -> bool {
    match value {
        None => matches!(expected, Bson::Null),
        Some(actual) => {
            equals(actual, expected)
                || matches!(actual, Bson::Array(items) if items.iter().any(|i| equals(i, expected)))
        }
    }
}

fn in_match(value: Option<&Bson>, candidates: &[Candidate]) -> bool {
    candidates.iter().any(|candidate| match candidate {
        Candidate::Value(expected) => eq_match(value, expected),
        Candidate::Pattern(re) => {
            any_element(value, |v| matches!(v, Bson::String(s) if re.is_match(s)))
        }
    })
}

/// Applies `f` to the value, or to each element when it is an array
fn any_element(value: Option<&Bson>, f: impl Fn(&Bson) -> bool) -> bool {
    match value {
        None => false,
        Some(Bson::Array(items)) => items.iter().any(&f),
        Some(v) => f(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn matches(filter: Document, doc: &Document) -> bool {
        CompiledFilter::compile(&filter).unwrap().matches(doc)
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = CompiledFilter::compile(&doc! {}).unwrap();
        assert!(filter.is_match_all());
        assert!(filter.matches(&doc! { "a": 1 }));
    }

    #[test]
    fn test_case_insensitive_regex() {
        let doc = doc! { "name": "Desk Lamp" };
        assert!(matches(doc! { "name": { "$regex": "lamp", "$options": "i" } }, &doc));
        assert!(!matches(doc! { "name": { "$regex": "lamp" } }, &doc));
    }

    #[test]
    fn test_regex_only_matches_strings() {
        let doc = doc! { "qty": 12 };
        assert!(!matches(doc! { "qty": { "$regex": "12" } }, &doc));
    }

    #[test]
    fn test_regex_on_array_elements() {
        let doc = doc! { "tags": ["Red", "blue"] };
        assert!(matches(doc! { "tags": { "$regex": "^red$", "$options": "i" } }, &doc));
    }

    #[test]
    fn test_in_operator() {
        let doc = doc! { "color": "red", "tags": ["a", "b"] };
        assert!(matches(doc! { "color": { "$in": ["red", "green"] } }, &doc));
        assert!(matches(doc! { "tags": { "$in": ["b"] } }, &doc));
        assert!(!matches(doc! { "color": { "$in": ["blue"] } }, &doc));
        assert!(matches(doc! { "color": { "$nin": ["blue"] } }, &doc));
    }

    #[test]
    fn test_equality_widens_numbers() {
        let doc = doc! { "qty": 4_i32 };
        assert!(matches(doc! { "qty": 4_i64 }, &doc));
        assert!(matches(doc! { "qty": 4.0 }, &doc));
        assert!(!matches(doc! { "qty": "4" }, &doc));
    }

    #[test]
    fn test_or_and_nor() {
        let doc = doc! { "a": 1, "b": 2 };
        assert!(matches(doc! { "$or": [ { "a": 5 }, { "b": 2 } ] }, &doc));
        assert!(!matches(doc! { "$or": [ { "a": 5 }, { "b": 5 } ] }, &doc));
        assert!(matches(doc! { "$and": [ { "a": 1 }, { "b": 2 } ] }, &doc));
        assert!(matches(doc! { "$nor": [ { "a": 5 } ] }, &doc));
    }

    #[test]
    fn test_range_within_bracket() {
        let doc = doc! { "price": 10.5, "name": "m" };
        assert!(matches(doc! { "price": { "$gt": 10, "$lte": 11 } }, &doc));
        assert!(!matches(doc! { "price": { "$gt": "a" } }, &doc));
        assert!(matches(doc! { "name": { "$gte": "a", "$lt": "n" } }, &doc));
    }

    #[test]
    fn test_missing_and_null() {
        let doc = doc! { "a": 1 };
        assert!(matches(doc! { "b": null }, &doc));
        assert!(!matches(doc! { "b": 1 }, &doc));
        assert!(matches(doc! { "b": { "$exists": false } }, &doc));
        assert!(matches(doc! { "a": { "$exists": true } }, &doc));
        assert!(matches(doc! { "b": { "$ne": 1 } }, &doc));
    }

    #[test]
    fn test_dotted_path() {
        let doc = doc! { "owner": { "name": "Ada" } };
        assert!(matches(doc! { "owner.name": "Ada" }, &doc));
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let err = CompiledFilter::compile(&doc! { "a": { "$where": "x" } }).unwrap_err();
        assert!(matches!(err, StoreError::Unsupported { kind: "operator", .. }));

        let err = CompiledFilter::compile(&doc! { "$text": { "$search": "x" } }).unwrap_err();
        assert!(matches!(err, StoreError::Unsupported { .. }));
    }

    #[test]
    fn test_bad_regex_rejected() {
        let err = CompiledFilter::compile(&doc! { "a": { "$regex": "(" } }).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn test_literal_document_equality() {
        let doc = doc! { "dims": { "w": 2, "h": 3 } };
        assert!(matches(doc! { "dims": { "w": 2, "h": 3 } }, &doc));
        assert!(!matches(doc! { "dims": { "w": 2 } }, &doc));
    }
}
