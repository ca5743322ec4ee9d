//! List query parameters: filters, sort and pagination window

use crate::config::Settings;
use crate::core::error::{RequestError, RestResult};
use crate::core::record::{Record, is_system_field};
use crate::core::schema::EntitySchema;
use indexmap::IndexMap;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Query parameters that are never treated as filters
pub const RESERVED_PARAMS: [&str; 4] = ["graph", "sort", "size", "start"];

/// Suffix accepted on relation filters (`note__id=<key>`)
const RELATION_KEY_SUFFIX: &str = "__id";

/// Sort field and direction
///
/// # Format
/// - `field` (ascending)
/// - `-field` (descending)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub descending: bool,
}

impl SortSpec {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (field, descending) = match raw.strip_prefix('-') {
            Some(field) => (field, true),
            None => (raw, false),
        };
        if field.is_empty() {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            descending,
        })
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Filters and sort handed to a repository's `list`
///
/// Filters are exact matches on field values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filters: IndexMap<String, Value>,
    pub sort: Option<SortSpec>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.insert(field.into(), value);
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Build the query of a list request
    ///
    /// Parameters naming unknown fields are ignored, values are coerced by
    /// field kind, and the type's default filters are merged in unless the
    /// request filters the same field.
    pub fn build(
        schema: &EntitySchema,
        params: &HashMap<String, String>,
        settings: &Settings,
    ) -> RestResult<Self> {
        let mut filters = IndexMap::new();

        let mut names: Vec<&String> = params.keys().collect();
        names.sort();
        for param in names {
            if RESERVED_PARAMS.contains(&param.as_str()) {
                continue;
            }
            let raw = &params[param];
            let Some((field, value)) = Self::coerce_filter(schema, param, raw) else {
                continue;
            };
            let value = value.ok_or_else(|| RequestError::InvalidQuery {
                param: param.clone(),
                message: format!("'{}' is not a valid value", raw),
            })?;
            filters.insert(field, value);
        }

        for (field, value) in schema.list_default_filters() {
            if !filters.contains_key(field) {
                filters.insert(field.clone(), value.clone());
            }
        }

        let requested = params
            .get("sort")
            .and_then(|raw| SortSpec::parse(raw))
            .filter(|sort| Self::sortable(schema, &sort.field));
        if requested.is_none() && params.contains_key("sort") {
            tracing::debug!(
                entity_type = schema.name(),
                sort = params.get("sort").map(String::as_str),
                "ignoring sort on unknown or hidden field"
            );
        }
        let sort = requested.or_else(|| {
            SortSpec::parse(&settings.default_sort)
                .filter(|sort| Self::sortable(schema, &sort.field))
        });

        Ok(Self { filters, sort })
    }

    /// Field name and coerced value for one parameter, `None` if the
    /// parameter does not name a filterable field
    ///
    /// Never-show fields are not filterable: a match count would reveal them.
    fn coerce_filter(
        schema: &EntitySchema,
        param: &str,
        raw: &str,
    ) -> Option<(String, Option<Value>)> {
        if param == "id" {
            let value = uuid::Uuid::parse_str(raw)
                .ok()
                .map(|key| Value::String(key.to_string()));
            return Some(("id".to_string(), value));
        }

        let field = match schema.field(param) {
            Some(field) => field,
            None => {
                let base = param.strip_suffix(RELATION_KEY_SUFFIX)?;
                schema.field(base).filter(|f| f.is_relation())?
            }
        };
        if schema.is_never_shown(&field.name) {
            return None;
        }
        Some((field.name.clone(), field.coerce_param(raw)))
    }

    fn sortable(schema: &EntitySchema, field: &str) -> bool {
        (is_system_field(field) || schema.has_field(field)) && !schema.is_never_shown(field)
    }

    /// True when `record` satisfies every filter
    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|(field, expected)| {
            let actual = record.value(field).unwrap_or(Value::Null);
            values_equal(&actual, expected)
        })
    }

    /// Ordering of two records under this query's sort
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let Some(sort) = &self.sort else {
            return Ordering::Equal;
        };
        let ordering = match sort.field.as_str() {
            "created" => a.created.cmp(&b.created),
            "modified" => a.modified.cmp(&b.modified),
            field => compare_values(
                &a.value(field).unwrap_or(Value::Null),
                &b.value(field).unwrap_or(Value::Null),
            ),
        };
        if sort.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Pagination window of a list request (`start`, `size`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub size: usize,
}

impl Window {
    /// Read `start`/`size`; size defaults from settings and is clamped to the maximum
    pub fn from_params(params: &HashMap<String, String>, settings: &Settings) -> RestResult<Self> {
        let parse = |name: &str| -> RestResult<Option<usize>> {
            match params.get(name) {
                None => Ok(None),
                Some(raw) => raw.trim().parse::<usize>().map(Some).map_err(|_| {
                    RequestError::InvalidQuery {
                        param: name.to_string(),
                        message: format!("'{}' is not a non-negative integer", raw),
                    }
                    .into()
                }),
            }
        };

        let start = parse("start")?.unwrap_or(0);
        let size = parse("size")?
            .unwrap_or(settings.default_list_size)
            .clamp(1, settings.max_list_size.max(1));
        Ok(Self { start, size })
    }

    /// The slice of `items` inside the window
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.start).take(self.size).collect()
    }
}
