//! Entity mutator: turns a write payload into a change set and persists it
//!
//! Per declared field present in the payload, in declaration order:
//! 1. a registered setter hook handles the value
//! 2. relations resolve the key through the related repository; an unknown
//!    key leaves the field untouched and the rest of the payload applies
//! 3. json fields deep-merge object payloads, other values overwrite
//! 4. every other kind is checked and overwritten

use crate::core::error::{RestResult, ValidationError};
use crate::core::field::FieldDef;
use crate::core::record::{ChangeSet, Record};
use crate::core::repository::RepositorySet;
use crate::core::schema::EntitySchema;
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Clone)]
pub struct EntityMutator {
    repositories: RepositorySet,
}

impl EntityMutator {
    pub fn new(repositories: RepositorySet) -> Self {
        Self { repositories }
    }

    /// Build a new instance from `payload` and insert it
    pub async fn create(
        &self,
        schema: &EntitySchema,
        payload: &Map<String, Value>,
    ) -> RestResult<Record> {
        self.apply(schema, schema.new_record(), payload, true).await
    }

    /// Apply `payload` onto the stored `instance` and save it atomically
    ///
    /// An instance deleted since it was loaded stays deleted and reports not found.
    pub async fn update(
        &self,
        schema: &EntitySchema,
        instance: Record,
        payload: &Map<String, Value>,
    ) -> RestResult<Record> {
        self.apply(schema, instance, payload, false).await
    }

    async fn apply(
        &self,
        schema: &EntitySchema,
        instance: Record,
        payload: &Map<String, Value>,
        is_new: bool,
    ) -> RestResult<Record> {
        let changes = self.changes(schema, &instance, payload).await?;

        let mut projected = instance.clone();
        changes.apply_to(&mut projected);
        check_required(schema, &projected)?;

        let repository = self.repositories.require(schema.name())?;
        let saved = if is_new {
            repository.insert(instance, &changes).await
        } else {
            repository.update(instance, &changes).await
        };
        let saved = saved.map_err(|e| {
            tracing::warn!(entity_type = schema.name(), error = %e, "save failed");
            e
        })?;
        Ok(saved)
    }

    /// Field writes `payload` produces against `instance`, without saving
    pub async fn changes(
        &self,
        schema: &EntitySchema,
        instance: &Record,
        payload: &Map<String, Value>,
    ) -> RestResult<ChangeSet> {
        let mut changes = ChangeSet::new();

        for field in schema.fields() {
            let Some(value) = payload.get(&field.name) else {
                continue;
            };

            if let Some(setter) = schema.hooks().setter(&field.name) {
                let mut local = ChangeSet::new();
                setter(instance, value, &mut local)
                    .map_err(|message| ValidationError::field(field.name.clone(), message))?;
                changes.extend(local);
                continue;
            }

            if !field.editable {
                tracing::debug!(entity_type = schema.name(), field = %field.name, "ignoring read-only field");
                continue;
            }

            if field.is_relation() {
                if let Some(resolved) = self.resolve_relation(field, value).await? {
                    changes.set(field.name.clone(), resolved);
                }
                continue;
            }

            match value {
                Value::Object(patch) if field.is_json() => {
                    changes.merge(field.name.clone(), patch.clone());
                }
                _ => {
                    field
                        .check_value(value)
                        .map_err(|message| ValidationError::field(field.name.clone(), message))?;
                    changes.set(field.name.clone(), value.clone());
                }
            }
        }

        Ok(changes)
    }

    /// Stored value for a relation write, `None` to leave the field as is
    async fn resolve_relation(&self, field: &FieldDef, value: &Value) -> RestResult<Option<Value>> {
        if value.is_null() {
            field
                .check_value(value)
                .map_err(|message| ValidationError::field(field.name.clone(), message))?;
            return Ok(Some(Value::Null));
        }

        let related_type = field.related.as_deref().unwrap_or_default();
        let key = value.as_str().and_then(|raw| Uuid::parse_str(raw).ok());
        let Some(key) = key else {
            tracing::debug!(field = %field.name, %value, "skipping malformed related key");
            return Ok(None);
        };

        match self.repositories.resolve_related(related_type, &key).await? {
            Some(related) => Ok(Some(Value::String(related.id.to_string()))),
            None => {
                tracing::debug!(field = %field.name, related_type, %key, "skipping unknown related key");
                Ok(None)
            }
        }
    }
}

fn check_required(schema: &EntitySchema, record: &Record) -> Result<(), ValidationError> {
    let missing: Vec<String> = schema
        .fields()
        .filter(|field| !field.nullable)
        .filter(|field| record.get(&field.name).is_none_or(Value::is_null))
        .map(|field| field.name.clone())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingRequired { fields: missing })
    }
}
