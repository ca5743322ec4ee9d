//! Shared fixtures for the integration tests
//!
//! Three entity types mirror a small ticketing app:
//! - `todo`: unrestricted, not deletable, relates to a note
//! - `note`: hidden password, view/save permissions, not deletable
//! - `group`: setter-validated name, default `is_active` filter, deletable

#![allow(dead_code)]

use graph_rest::prelude::*;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn todo_schema() -> EntitySchema {
    EntitySchema::builder("todo")
        .field(FieldDef::string("name"))
        .field(FieldDef::string("kind").nullable())
        .field(FieldDef::string("description").nullable())
        .field(FieldDef::relation("note", "note"))
        .graph("basic", GraphSpec::new().fields(["id", "name", "description"]))
        .graph(
            "default",
            GraphSpec::new()
                .fields(["id", "name", "kind", "description"])
                .relation("note", "basic"),
        )
        .can_delete(false)
        .build()
        .expect("valid todo schema")
}

pub fn note_schema() -> EntitySchema {
    EntitySchema::builder("note")
        .field(FieldDef::string("name"))
        .field(FieldDef::string("password").with_default(json!("this is hidden")))
        .field(FieldDef::json("metadata"))
        .never_show("password")
        .graph("basic", GraphSpec::new().fields(["id", "name"]))
        .graph(
            "default",
            GraphSpec::new().fields(["id", "name", "metadata", "created", "modified"]),
        )
        .graph(
            "leaky",
            GraphSpec::new()
                .fields(["id", "name"])
                .extra("password")
                .extra(Selector::aliased("password", "pw"))
                .extra(Selector::aliased("name", "password")),
        )
        .permission(Operation::View, ["view_notes", "save_notes"])
        .permission(Operation::Save, ["save_notes"])
        .can_delete(false)
        .build()
        .expect("valid note schema")
}

pub fn group_schema() -> EntitySchema {
    EntitySchema::builder("group")
        .field(FieldDef::string("name"))
        .field(FieldDef::boolean("is_active").with_default(json!(true)))
        .field(FieldDef::string("kind").with_default(json!("group")))
        .field(FieldDef::relation("parent", "group"))
        .field(FieldDef::json("metadata"))
        .graph(
            "default",
            GraphSpec::new()
                .fields(["id", "name", "is_active", "kind", "metadata"])
                .fields([("name", "title")])
                .extra("label")
                .relation("parent", "default"),
        )
        .graph("list", GraphSpec::new().fields(["id", "name", "is_active"]))
        .default_filter("is_active", json!(true))
        .permission(Operation::View, ["view_groups", "manage_groups"])
        .permission(Operation::Save, ["manage_groups"])
        .can_delete(true)
        .setter("name", |_, value, changes| {
            let name = value.as_str().map(str::trim).unwrap_or_default();
            if name.is_empty() {
                return Err("group name may not be blank".to_string());
            }
            changes.set("name", json!(name));
            Ok(())
        })
        .getter("label", |record| {
            let name = record.value("name").unwrap_or(Value::Null);
            let kind = record.value("kind").unwrap_or(Value::Null);
            json!(format!(
                "{} ({})",
                name.as_str().unwrap_or_default(),
                kind.as_str().unwrap_or_default()
            ))
        })
        .build()
        .expect("valid group schema")
}

pub fn registry() -> Arc<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    registry.register(todo_schema());
    registry.register(note_schema());
    registry.register(group_schema());
    Arc::new(registry)
}

/// Entity types with in-memory repositories, plus handles on each repository
pub struct Fixture {
    pub dispatcher: Arc<RestDispatcher>,
    pub todos: InMemoryRepository,
    pub notes: InMemoryRepository,
    pub groups: InMemoryRepository,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let todos = InMemoryRepository::new("todo");
        let notes = InMemoryRepository::new("note");
        let groups = InMemoryRepository::new("group");

        let mut repositories = RepositorySet::new();
        repositories.register("todo", Arc::new(todos.clone()));
        repositories.register("note", Arc::new(notes.clone()));
        repositories.register("group", Arc::new(groups.clone()));

        Self {
            dispatcher: Arc::new(RestDispatcher::new(registry(), repositories, settings)),
            todos,
            notes,
            groups,
        }
    }

    pub async fn dispatch(&self, request: RestRequest, principal: Option<&Principal>) -> RestResponse {
        self.dispatcher.dispatch(request, principal).await
    }

    /// Create through the dispatcher and return the rendered data
    pub async fn create(&self, entity_type: &str, body: Value, principal: Option<&Principal>) -> Value {
        let response = self
            .dispatch(RestRequest::new(RestMethod::Post, entity_type).with_body(body), principal)
            .await;
        assert!(response.is_ok(), "create failed: {}", response.body);
        response.body["data"].clone()
    }
}

pub fn manager() -> Principal {
    Principal::new("manager", ["manage_groups", "save_notes"])
}

pub fn viewer() -> Principal {
    Principal::new("viewer", ["view_groups", "view_notes"])
}

pub fn key_of(data: &Value) -> String {
    data["id"].as_str().expect("rendered id").to_string()
}

pub fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("json object")
}

/// Repository wrapper counting every call made against it
#[derive(Clone)]
pub struct CountingRepository {
    inner: InMemoryRepository,
    calls: Arc<AtomicUsize>,
}

impl CountingRepository {
    pub fn new(entity_type: &str) -> Self {
        Self {
            inner: InMemoryRepository::new(entity_type),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Repository for CountingRepository {
    async fn get_by_key(&self, key: &EntityKey) -> Result<Option<Record>, StorageError> {
        self.hit();
        self.inner.get_by_key(key).await
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Record>, StorageError> {
        self.hit();
        self.inner.list(query).await
    }

    async fn insert(&self, record: Record, changes: &ChangeSet) -> Result<Record, StorageError> {
        self.hit();
        self.inner.insert(record, changes).await
    }

    async fn update(&self, base: Record, changes: &ChangeSet) -> Result<Record, StorageError> {
        self.hit();
        self.inner.update(base, changes).await
    }

    async fn delete(&self, record: &Record) -> Result<(), StorageError> {
        self.hit();
        self.inner.delete(record).await
    }
}

/// Repository whose every call fails like an unreachable backend
pub struct FailingRepository;

#[async_trait]
impl Repository for FailingRepository {
    async fn get_by_key(&self, _key: &EntityKey) -> Result<Option<Record>, StorageError> {
        Err(Self::down())
    }

    async fn list(&self, _query: &ListQuery) -> Result<Vec<Record>, StorageError> {
        Err(Self::down())
    }

    async fn insert(&self, _record: Record, _changes: &ChangeSet) -> Result<Record, StorageError> {
        Err(Self::down())
    }

    async fn update(&self, _base: Record, _changes: &ChangeSet) -> Result<Record, StorageError> {
        Err(Self::down())
    }

    async fn delete(&self, _record: &Record) -> Result<(), StorageError> {
        Err(Self::down())
    }
}

impl FailingRepository {
    fn down() -> StorageError {
        StorageError::Unavailable {
            backend: "failing".to_string(),
        }
    }
}
