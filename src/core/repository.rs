//! Repository contract consumed by the dispatch pipeline

use crate::core::error::{RequestError, RestError, RestResult, StorageError};
use crate::core::query::ListQuery;
use crate::core::record::{ChangeSet, EntityKey, Record};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Storage of one entity type
///
/// Implementations own atomicity: `insert` and `update` commit every write of
/// the change set in one step, or none of them.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Load an instance by key
    async fn get_by_key(&self, key: &EntityKey) -> Result<Option<Record>, StorageError>;

    /// Filtered and sorted instances, in sort order
    async fn list(&self, query: &ListQuery) -> Result<Vec<Record>, StorageError>;

    /// Store a new instance with `changes` applied
    ///
    /// Fails with [`StorageError::Integrity`] when the key is already taken.
    async fn insert(&self, record: Record, changes: &ChangeSet) -> Result<Record, StorageError>;

    /// Persist `changes` on top of the currently stored version of `base`
    ///
    /// Fails with [`StorageError::Missing`] when nothing is stored under the
    /// key anymore, so a concurrent delete is never undone.
    async fn update(&self, base: Record, changes: &ChangeSet) -> Result<Record, StorageError>;

    /// Remove an instance
    async fn delete(&self, record: &Record) -> Result<(), StorageError>;
}

/// Repositories of every exposed entity type
#[derive(Clone, Default)]
pub struct RepositorySet {
    repositories: HashMap<String, Arc<dyn Repository>>,
}

impl RepositorySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity_type: impl Into<String>, repository: Arc<dyn Repository>) {
        self.repositories.insert(entity_type.into(), repository);
    }

    pub fn get(&self, entity_type: &str) -> Option<Arc<dyn Repository>> {
        self.repositories.get(entity_type).cloned()
    }

    pub fn require(&self, entity_type: &str) -> RestResult<Arc<dyn Repository>> {
        self.get(entity_type).ok_or_else(|| {
            RestError::Request(RequestError::UnknownEntityType {
                entity_type: entity_type.to_string(),
            })
        })
    }

    pub fn contains(&self, entity_type: &str) -> bool {
        self.repositories.contains_key(entity_type)
    }

    /// Look up a related instance; an unregistered type resolves to `None`
    pub async fn resolve_related(
        &self,
        related_type: &str,
        key: &EntityKey,
    ) -> Result<Option<Record>, StorageError> {
        match self.repositories.get(related_type) {
            Some(repository) => repository.get_by_key(key).await,
            None => {
                tracing::warn!(related_type, "no repository registered for related type");
                Ok(None)
            }
        }
    }
}
