//! Live entity instances and the change sets applied to them

use crate::core::merge::deep_merge;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Opaque primary key of an entity instance
pub type EntityKey = Uuid;

/// Fields every record carries independently of its schema
pub const SYSTEM_FIELDS: [&str; 3] = ["id", "created", "modified"];

/// Returns true for `id`, `created` and `modified`
pub fn is_system_field(name: &str) -> bool {
    SYSTEM_FIELDS.contains(&name)
}

/// A persisted (or about to be persisted) entity instance
///
/// Relation fields hold the related key as a string, or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: EntityKey,

    pub entity_type: String,

    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,

    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create a blank record with a fresh, time-ordered key
    pub fn new(entity_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            entity_type: entity_type.into(),
            created: now,
            modified: now,
            fields: Map::new(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.set(field, value);
        self
    }

    /// Value of `id`, `created` or `modified`
    pub fn system_value(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::String(self.id.to_string())),
            "created" => Some(Value::String(self.created.to_rfc3339())),
            "modified" => Some(Value::String(self.modified.to_rfc3339())),
            _ => None,
        }
    }

    /// System value or stored field value
    pub fn value(&self, name: &str) -> Option<Value> {
        self.system_value(name).or_else(|| self.get(name).cloned())
    }

    /// Key stored in a relation field, if any
    pub fn relation_key(&self, field: &str) -> Option<EntityKey> {
        self.get(field)
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }

    /// Refresh the modification timestamp
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }
}

/// A single pending write to one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldWrite {
    /// Overwrite the stored value
    Set(Value),
    /// Deep-merge into the stored map
    Merge(Map<String, Value>),
}

/// Ordered field writes produced by one mutation
///
/// Repositories commit a change set as a unit against the currently stored
/// record, so merges into disjoint map keys from concurrent requests compose.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    writes: Vec<(String, FieldWrite)>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.writes.push((field.into(), FieldWrite::Set(value)));
    }

    pub fn merge(&mut self, field: impl Into<String>, patch: Map<String, Value>) {
        self.writes.push((field.into(), FieldWrite::Merge(patch)));
    }

    pub fn extend(&mut self, other: ChangeSet) {
        self.writes.extend(other.writes);
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldWrite)> {
        self.writes.iter().map(|(field, write)| (field.as_str(), write))
    }

    /// Names of the fields touched, in write order (may repeat)
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.writes.iter().map(|(field, _)| field.as_str())
    }

    /// Apply every write to `record` in order
    pub fn apply_to(&self, record: &mut Record) {
        for (field, write) in &self.writes {
            match write {
                FieldWrite::Set(value) => {
                    record.fields.insert(field.clone(), value.clone());
                }
                FieldWrite::Merge(patch) => {
                    let slot = record
                        .fields
                        .entry(field.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if !slot.is_object() {
                        *slot = Value::Object(Map::new());
                    }
                    if let Value::Object(existing) = slot {
                        deep_merge(existing, patch);
                    }
                }
            }
        }
    }
}
