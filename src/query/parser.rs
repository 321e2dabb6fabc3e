//! Textual query parsing
//!
//! Accepts a JSON object with the keys `database`, `filter`, `sort`,
//! `projection`, `aggregation` and `match`. Values may use MongoDB
//! Extended JSON (`{"$oid": "..."}`, `{"$numberDecimal": "..."}`).
//! Unknown keys are rejected rather than ignored.

use bson::Bson;
use serde_json::{Map, Value};

use super::errors::{QueryError, QueryResult};
use super::spec::{
    Filter, FilterValue, FindQuery, MatchStrategy, Number, Pipeline, Projection, QueryMode,
    QuerySpec, SortDirection, SortKey,
};

const KEY_DATABASE: &str = "database";
const KEY_FILTER: &str = "filter";
const KEY_SORT: &str = "sort";
const KEY_PROJECTION: &str = "projection";
const KEY_AGGREGATION: &str = "aggregation";
const KEY_MATCH: &str = "match";

impl QuerySpec {
    /// Parses a JSON query description
    pub fn parse(text: &str) -> QueryResult<Self> {
        let value: Value = serde_json::from_str(text.trim())
            .map_err(|e| QueryError::Malformed(e.to_string()))?;
        Self::from_json(value)
    }

    /// Builds a spec from an already-decoded JSON value
    pub fn from_json(value: Value) -> QueryResult<Self> {
        let Value::Object(map) = value else {
            return Err(QueryError::Malformed(
                "query must be a JSON object".to_string(),
            ));
        };

        if let Some(key) = map.keys().find(|k| !is_known_key(k)) {
            return Err(QueryError::UnknownKey(key.clone()));
        }

        let database = match map.get(KEY_DATABASE) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(QueryError::MissingDatabase)
            }
            Some(other) => {
                return Err(QueryError::Malformed(format!(
                    "database must be a string, got {}",
                    json_kind(other)
                )))
            }
        };

        let mode = match non_null(map.get(KEY_AGGREGATION)) {
            Some(stages) => {
                if let Some(key) = [KEY_FILTER, KEY_SORT, KEY_PROJECTION, KEY_MATCH]
                    .into_iter()
                    .find(|k| non_null(map.get(*k)).is_some())
                {
                    return Err(QueryError::ConflictingModes(key.to_string()));
                }
                QueryMode::Aggregation(parse_pipeline(stages)?)
            }
            None => QueryMode::Regular(parse_find(&map)?),
        };

        QuerySpec::new(database, mode)
    }
}

fn is_known_key(key: &str) -> bool {
    matches!(
        key,
        KEY_DATABASE | KEY_FILTER | KEY_SORT | KEY_PROJECTION | KEY_AGGREGATION | KEY_MATCH
    )
}

fn parse_find(map: &Map<String, Value>) -> QueryResult<FindQuery> {
    let mut query = FindQuery::new();

    if let Some(value) = non_null(map.get(KEY_FILTER)) {
        query.filter = parse_filter(object(KEY_FILTER, value)?)?;
    }

    if let Some(value) = non_null(map.get(KEY_SORT)) {
        for (field, direction) in object(KEY_SORT, value)? {
            query.sort.push(SortKey {
                field: field.clone(),
                direction: parse_direction(field, direction)?,
            });
        }
    }

    if let Some(value) = non_null(map.get(KEY_PROJECTION)) {
        let mut projection = Projection::new();
        for (field, flag) in object(KEY_PROJECTION, value)? {
            projection = if parse_flag(field, flag)? {
                projection.include(field.clone())
            } else {
                projection.exclude(field.clone())
            };
        }
        query.projection = Some(projection);
    }

    if let Some(value) = non_null(map.get(KEY_MATCH)) {
        let strategy: MatchStrategy = serde_json::from_value(value.clone()).map_err(|_| {
            QueryError::entry(
                "match",
                value.to_string(),
                "expected \"any_field\" or \"declared_key\"",
            )
        })?;
        query.strategy = Some(strategy);
    }

    Ok(query)
}

fn parse_filter(map: &Map<String, Value>) -> QueryResult<Filter> {
    let mut filter = Filter::new();
    for (key, value) in map {
        filter.insert(key.clone(), parse_filter_value(key, value)?);
    }
    Ok(filter)
}

fn parse_filter_value(key: &str, value: &Value) -> QueryResult<FilterValue> {
    Ok(match value {
        Value::String(s) => FilterValue::Text(s.clone()),
        Value::Number(n) => FilterValue::Number(match n.as_i64() {
            Some(i) => Number::Int(i),
            None => Number::Float(n.as_f64().unwrap_or(f64::NAN)),
        }),
        Value::Array(items) => FilterValue::List(
            items
                .iter()
                .map(|item| to_bson("filter", key, item))
                .collect::<QueryResult<_>>()?,
        ),
        other => FilterValue::Verbatim(to_bson("filter", key, other)?),
    })
}

fn parse_direction(field: &str, value: &Value) -> QueryResult<SortDirection> {
    let direction = match value {
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(SortDirection::Asc),
            Some(-1) => Some(SortDirection::Desc),
            _ => None,
        },
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortDirection::Asc),
            "desc" | "descending" => Some(SortDirection::Desc),
            _ => None,
        },
        _ => None,
    };
    direction.ok_or_else(|| {
        QueryError::entry("sort", field, "expected 1, -1, \"asc\" or \"desc\"")
    })
}

fn parse_flag(field: &str, value: &Value) -> QueryResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_i64() == Some(1) => Ok(true),
        Value::Number(n) if n.as_i64() == Some(0) => Ok(false),
        _ => Err(QueryError::entry(
            "projection",
            field,
            "expected true, false, 1 or 0",
        )),
    }
}

fn parse_pipeline(value: &Value) -> QueryResult<Pipeline> {
    let Value::Array(items) = value else {
        return Err(QueryError::Malformed(format!(
            "aggregation must be an array of stages, got {}",
            json_kind(value)
        )));
    };

    let mut stages = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let stage = match Bson::try_from(item.clone()) {
            Ok(Bson::Document(doc)) => doc,
            Ok(_) => {
                return Err(QueryError::InvalidStage {
                    index,
                    reason: format!("expected an object, got {}", json_kind(item)),
                })
            }
            Err(e) => {
                return Err(QueryError::InvalidStage {
                    index,
                    reason: e.to_string(),
                })
            }
        };
        stages.push(stage);
    }
    Pipeline::new(stages)
}

fn to_bson(section: &'static str, key: &str, value: &Value) -> QueryResult<Bson> {
    Bson::try_from(value.clone()).map_err(|e| QueryError::entry(section, key, e.to_string()))
}

fn object<'a>(section: &'static str, value: &'a Value) -> QueryResult<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        QueryError::Malformed(format!(
            "{} must be an object, got {}",
            section,
            json_kind(value)
        ))
    })
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
