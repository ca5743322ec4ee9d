//! In-memory implementation of Repository for testing and development

use crate::core::error::StorageError;
use crate::core::query::ListQuery;
use crate::core::record::{ChangeSet, EntityKey, Record};
use crate::core::repository::Repository;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::{Arc, RwLock};

const BACKEND: &str = "in-memory";

/// In-memory repository of one entity type
///
/// Useful for testing and development. Uses RwLock for thread-safe access;
/// writes apply the whole change set under the write lock.
#[derive(Clone)]
pub struct InMemoryRepository {
    entity_type: String,
    records: Arc<RwLock<IndexMap<EntityKey, Record>>>,
}

impl InMemoryRepository {
    /// Create a new empty repository
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            records: Arc::new(RwLock::new(IndexMap::new())),
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_type(&self, record: &Record) -> Result<(), StorageError> {
        if record.entity_type == self.entity_type {
            return Ok(());
        }
        Err(StorageError::Integrity {
            message: format!(
                "cannot store a {} record in the {} repository",
                record.entity_type, self.entity_type
            ),
        })
    }

    fn poisoned<E>(_: E) -> StorageError {
        StorageError::LockPoisoned {
            backend: BACKEND.to_string(),
        }
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_by_key(&self, key: &EntityKey) -> Result<Option<Record>, StorageError> {
        let records = self.records.read().map_err(Self::poisoned)?;
        Ok(records.get(key).cloned())
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Record>, StorageError> {
        let records = self.records.read().map_err(Self::poisoned)?;

        let mut matched: Vec<Record> = records
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();
        matched.sort_by(|a, b| query.compare(a, b));

        Ok(matched)
    }

    async fn insert(&self, record: Record, changes: &ChangeSet) -> Result<Record, StorageError> {
        self.check_type(&record)?;
        let mut records = self.records.write().map_err(Self::poisoned)?;

        if records.contains_key(&record.id) {
            return Err(StorageError::Integrity {
                message: format!("{} '{}' already exists", self.entity_type, record.id),
            });
        }

        let mut record = record;
        changes.apply_to(&mut record);
        record.touch();
        records.insert(record.id, record.clone());

        Ok(record)
    }

    async fn update(&self, base: Record, changes: &ChangeSet) -> Result<Record, StorageError> {
        self.check_type(&base)?;
        let mut records = self.records.write().map_err(Self::poisoned)?;

        let Some(stored) = records.get_mut(&base.id) else {
            return Err(StorageError::Missing {
                entity_type: self.entity_type.clone(),
                key: base.id.to_string(),
            });
        };
        changes.apply_to(stored);
        stored.touch();

        Ok(stored.clone())
    }

    async fn delete(&self, record: &Record) -> Result<(), StorageError> {
        let mut records = self.records.write().map_err(Self::poisoned)?;
        records.shift_remove(&record.id);
        Ok(())
    }
}
