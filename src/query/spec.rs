//! Validated query description
//!
//! A `QuerySpec` names the target database and exactly one execution mode.
//! It is immutable once built; the router only ever reads it.

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

use super::errors::{QueryError, QueryResult};

/// Numeric filter operand
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl From<Number> for Bson {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(i) => Bson::Int64(i),
            Number::Float(f) => Bson::Double(f),
        }
    }
}

/// Value side of a filter entry.
///
/// The variant decides how the value is matched: text by case-insensitive
/// substring, lists by set membership, numbers by equality. `Verbatim`
/// holds anything else (booleans, nulls, operator documents) untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(Number),
    List(Vec<Bson>),
    Verbatim(Bson),
}

impl FilterValue {
    pub fn text(s: impl Into<String>) -> Self {
        FilterValue::Text(s.into())
    }

    pub fn int(i: i64) -> Self {
        FilterValue::Number(Number::Int(i))
    }

    pub fn float(f: f64) -> Self {
        FilterValue::Number(Number::Float(f))
    }

    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Ordered `{field: value}` filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    entries: Vec<(String, FilterValue)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing an earlier one with the same key
    pub fn with(mut self, key: impl Into<String>, value: FilterValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FilterValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Field inclusion/exclusion list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<(String, bool)>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, field: impl Into<String>) -> Self {
        self.fields.push((field.into(), true));
        self
    }

    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.fields.push((field.into(), false));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_document(&self) -> Document {
        self.fields
            .iter()
            .map(|(field, keep)| (field.clone(), Bson::Int32(i32::from(*keep))))
            .collect()
    }
}

/// How a regular-mode filter is turned into a store filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Search each filter value against every discovered field
    #[default]
    AnyField,
    /// Match each filter value on its own key only
    DeclaredKey,
}

/// Filter/sort/projection query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub sort: Vec<SortKey>,
    pub projection: Option<Projection>,
    /// Overrides the router's default strategy when set
    pub strategy: Option<MatchStrategy>,
}

impl FindQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, key: impl Into<String>, value: FilterValue) -> Self {
        self.filter.insert(key, value);
        self
    }

    pub fn sort(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn strategy(mut self, strategy: MatchStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn sort_document(&self) -> Option<Document> {
        if self.sort.is_empty() {
            return None;
        }
        Some(
            self.sort
                .iter()
                .map(|k| (k.field.clone(), Bson::Int32(k.direction.as_i32())))
                .collect(),
        )
    }

    pub fn projection_document(&self) -> Option<Document> {
        self.projection
            .as_ref()
            .filter(|p| !p.is_empty())
            .map(Projection::to_document)
    }
}

/// Immutable base aggregation pipeline.
///
/// There is no way to push into it; collection-specific stages are added
/// to the copy returned by `to_vec`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Document>,
}

impl Pipeline {
    /// Builds a pipeline, checking every stage names exactly one `$` operator
    pub fn new(stages: Vec<Document>) -> QueryResult<Self> {
        for (index, stage) in stages.iter().enumerate() {
            let mut keys = stage.keys();
            match (keys.next(), keys.next()) {
                (Some(op), None) if op.starts_with('$') => {}
                (None, _) => {
                    return Err(QueryError::InvalidStage {
                        index,
                        reason: "stage is empty".to_string(),
                    })
                }
                (Some(op), None) => {
                    return Err(QueryError::InvalidStage {
                        index,
                        reason: format!("'{}' is not a stage operator", op),
                    })
                }
                (Some(_), Some(_)) => {
                    return Err(QueryError::InvalidStage {
                        index,
                        reason: "stage must contain exactly one operator".to_string(),
                    })
                }
            }
        }
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Document] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Fresh, independently owned copy of the stages
    pub fn to_vec(&self) -> Vec<Document> {
        self.stages.clone()
    }
}

/// Execution mode
#[derive(Debug, Clone, PartialEq)]
pub enum QueryMode {
    Regular(FindQuery),
    Aggregation(Pipeline),
}

impl QueryMode {
    pub fn name(&self) -> &'static str {
        match self {
            QueryMode::Regular(_) => "regular",
            QueryMode::Aggregation(_) => "aggregation",
        }
    }
}

/// A validated request against one database
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    database: String,
    mode: QueryMode,
}

impl QuerySpec {
    pub fn new(database: impl Into<String>, mode: QueryMode) -> QueryResult<Self> {
        let database = database.into();
        if database.trim().is_empty() {
            return Err(QueryError::MissingDatabase);
        }
        Ok(Self { database, mode })
    }

    pub fn find(database: impl Into<String>, query: FindQuery) -> QueryResult<Self> {
        Self::new(database, QueryMode::Regular(query))
    }

    pub fn aggregate(database: impl Into<String>, pipeline: Pipeline) -> QueryResult<Self> {
        Self::new(database, QueryMode::Aggregation(pipeline))
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn mode(&self) -> &QueryMode {
        &self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_empty_database_rejected() {
        let err = QuerySpec::find("  ", FindQuery::new()).unwrap_err();
        assert_eq!(err, QueryError::MissingDatabase);
    }

    #[test]
    fn test_filter_insert_replaces_key() {
        let filter = Filter::new()
            .with("name", FilterValue::text("a"))
            .with("age", FilterValue::int(3))
            .with("name", FilterValue::text("b"));

        let entries: Vec<_> = filter.iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ("name", &FilterValue::text("b")));
    }

    #[test]
    fn test_sort_document_preserves_order() {
        let query = FindQuery::new()
            .sort(SortKey::desc("price"))
            .sort(SortKey::asc("name"));

        assert_eq!(
            query.sort_document(),
            Some(doc! { "price": -1, "name": 1 })
        );
        assert_eq!(FindQuery::new().sort_document(), None);
    }

    #[test]
    fn test_projection_document() {
        let query = FindQuery::new().projection(Projection::new().include("name").exclude("_id"));
        assert_eq!(
            query.projection_document(),
            Some(doc! { "name": 1, "_id": 0 })
        );
    }

    #[test]
    fn test_pipeline_stage_validation() {
        assert!(Pipeline::new(vec![doc! { "$match": {} }, doc! { "$limit": 5 }]).is_ok());

        let err = Pipeline::new(vec![doc! { "$match": {}, "$limit": 1 }]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidStage { index: 0, .. }));

        let err = Pipeline::new(vec![doc! { "$limit": 1 }, doc! { "match": {} }]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidStage { index: 1, .. }));
    }

    #[test]
    fn test_pipeline_copy_is_independent() {
        let base = Pipeline::new(vec![doc! { "$match": {} }]).unwrap();
        let mut copy = base.to_vec();
        copy.insert(0, doc! { "$limit": 1 });

        assert_eq!(base.len(), 1);
        assert_eq!(copy.len(), 2);
    }
}
