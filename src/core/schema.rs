//! Entity type declarations
//!
//! An [`EntitySchema`] is the explicit, per-type configuration object: fields,
//! graphs, hidden fields, permission table, list defaults and the registered
//! setter/getter hooks. Schemas are built once at registration time and are
//! immutable while requests are served.

use crate::core::error::ConfigError;
use crate::core::field::FieldDef;
use crate::core::graph::{GraphSpec, ResolvedGraph};
use crate::core::permission::{Operation, PermissionChains, PermissionRequirement, PermissionTable};
use crate::core::record::{ChangeSet, Record, is_system_field};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Custom write handler for one field
///
/// Receives the instance as currently projected and the raw payload value, and
/// records its writes into the change set. An `Err` is surfaced as a
/// validation failure carrying the returned message.
pub type SetterFn =
    Arc<dyn Fn(&Record, &Value, &mut ChangeSet) -> Result<(), String> + Send + Sync>;

/// Computed value backing a graph selector
pub type GetterFn = Arc<dyn Fn(&Record) -> Value + Send + Sync>;

/// Registered-function table of an entity type
#[derive(Clone, Default)]
pub struct EntityHooks {
    setters: HashMap<String, SetterFn>,
    getters: HashMap<String, GetterFn>,
}

impl EntityHooks {
    pub fn setter(&self, field: &str) -> Option<&SetterFn> {
        self.setters.get(field)
    }

    pub fn getter(&self, name: &str) -> Option<&GetterFn> {
        self.getters.get(name)
    }

    pub fn on_set<F>(&mut self, field: impl Into<String>, setter: F)
    where
        F: Fn(&Record, &Value, &mut ChangeSet) -> Result<(), String> + Send + Sync + 'static,
    {
        self.setters.insert(field.into(), Arc::new(setter));
    }

    pub fn on_get<F>(&mut self, name: impl Into<String>, getter: F)
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        self.getters.insert(name.into(), Arc::new(getter));
    }
}

impl fmt::Debug for EntityHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut setters: Vec<&String> = self.setters.keys().collect();
        let mut getters: Vec<&String> = self.getters.keys().collect();
        setters.sort();
        getters.sort();
        f.debug_struct("EntityHooks")
            .field("setters", &setters)
            .field("getters", &getters)
            .finish()
    }
}

/// Declaration of one entity type
#[derive(Debug, Clone)]
pub struct EntitySchema {
    name: String,
    fields: IndexMap<String, FieldDef>,
    graphs: IndexMap<String, GraphSpec>,
    never_show: BTreeSet<String>,
    permissions: PermissionTable,
    chains: Option<PermissionChains>,
    can_delete: bool,
    list_default_filters: IndexMap<String, Value>,
    hooks: EntityHooks,
}

impl EntitySchema {
    pub fn builder(name: impl Into<String>) -> EntitySchemaBuilder {
        EntitySchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Declared fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.values()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn graph(&self, name: &str) -> Option<&GraphSpec> {
        self.graphs.get(name)
    }

    pub fn graph_names(&self) -> impl Iterator<Item = &str> {
        self.graphs.keys().map(String::as_str)
    }

    pub fn is_never_shown(&self, name: &str) -> bool {
        self.never_show.contains(name)
    }

    pub fn never_show(&self) -> impl Iterator<Item = &str> {
        self.never_show.iter().map(String::as_str)
    }

    pub fn permissions(&self) -> &PermissionTable {
        &self.permissions
    }

    /// Per-type fallback chains, if this type overrides the global ones
    pub fn chains(&self) -> Option<&PermissionChains> {
        self.chains.as_ref()
    }

    pub fn can_delete(&self) -> bool {
        self.can_delete
    }

    pub fn list_default_filters(&self) -> &IndexMap<String, Value> {
        &self.list_default_filters
    }

    pub fn hooks(&self) -> &EntityHooks {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut EntityHooks {
        &mut self.hooks
    }

    /// A blank instance carrying every field's initial value
    pub fn new_record(&self) -> Record {
        let mut record = Record::new(self.name.clone());
        for field in self.fields.values() {
            record.set(field.name.clone(), field.initial_value());
        }
        record
    }

    /// Resolve a graph by name; unknown names resolve to the raw fallback
    pub fn resolve_graph<'a>(&'a self, name: &'a str) -> ResolvedGraph<'a> {
        match self.graphs.get_key_value(name) {
            Some((name, spec)) => ResolvedGraph::Named { name, spec },
            None => ResolvedGraph::RawFallback { requested: name },
        }
    }
}

/// Builder for [`EntitySchema`], validating the declaration on `build`
pub struct EntitySchemaBuilder {
    name: String,
    fields: Vec<FieldDef>,
    graphs: IndexMap<String, GraphSpec>,
    never_show: BTreeSet<String>,
    permissions: PermissionTable,
    chains: Option<PermissionChains>,
    can_delete: bool,
    list_default_filters: IndexMap<String, Value>,
    hooks: EntityHooks,
}

impl EntitySchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            graphs: IndexMap::new(),
            never_show: BTreeSet::new(),
            permissions: PermissionTable::default(),
            chains: None,
            can_delete: false,
            list_default_filters: IndexMap::new(),
            hooks: EntityHooks::default(),
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn graph(mut self, name: impl Into<String>, spec: GraphSpec) -> Self {
        self.graphs.insert(name.into(), spec);
        self
    }

    pub fn never_show(mut self, field: impl Into<String>) -> Self {
        self.never_show.insert(field.into());
        self
    }

    /// Declare the requirement of one operation class (empty = unrestricted)
    pub fn permission<I, S>(mut self, operation: Operation, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .declare(operation, PermissionRequirement::new(tags));
        self
    }

    pub fn permissions(mut self, table: PermissionTable) -> Self {
        self.permissions = table;
        self
    }

    pub fn chains(mut self, chains: PermissionChains) -> Self {
        self.chains = Some(chains);
        self
    }

    pub fn can_delete(mut self, allowed: bool) -> Self {
        self.can_delete = allowed;
        self
    }

    pub fn default_filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.list_default_filters.insert(field.into(), value);
        self
    }

    pub fn setter<F>(mut self, field: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&Record, &Value, &mut ChangeSet) -> Result<(), String> + Send + Sync + 'static,
    {
        self.hooks.on_set(field, setter);
        self
    }

    pub fn getter<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        self.hooks.on_get(name, getter);
        self
    }

    pub fn build(self) -> Result<EntitySchema, ConfigError> {
        let name = self.name;
        let invalid = |message: String| ConfigError::schema(name.clone(), message);

        if name.trim().is_empty() {
            return Err(invalid("entity type name may not be empty".into()));
        }

        let mut fields = IndexMap::new();
        for field in self.fields {
            if is_system_field(&field.name) {
                return Err(invalid(format!("'{}' is a reserved field name", field.name)));
            }
            if field.is_relation() && field.related.is_none() {
                return Err(invalid(format!(
                    "relation field '{}' has no related type",
                    field.name
                )));
            }
            if fields.contains_key(&field.name) {
                return Err(invalid(format!("duplicate field '{}'", field.name)));
            }
            fields.insert(field.name.clone(), field);
        }

        for (graph_name, spec) in &self.graphs {
            for relation in spec.graphs.keys() {
                if !fields.get(relation).is_some_and(FieldDef::is_relation) {
                    return Err(invalid(format!(
                        "graph '{}' expands '{}', which is not a relation field",
                        graph_name, relation
                    )));
                }
            }
        }

        for filter in self.list_default_filters.keys() {
            if !fields.contains_key(filter) && !is_system_field(filter) {
                return Err(invalid(format!("default filter on unknown field '{}'", filter)));
            }
        }

        let setter_fields: HashSet<&String> = self.hooks.setters.keys().collect();
        if let Some(unknown) = setter_fields.iter().find(|f| !fields.contains_key(f.as_str())) {
            return Err(invalid(format!("setter registered for unknown field '{}'", unknown)));
        }

        Ok(EntitySchema {
            name,
            fields,
            graphs: self.graphs,
            never_show: self.never_show,
            permissions: self.permissions,
            chains: self.chains,
            can_delete: self.can_delete,
            list_default_filters: self.list_default_filters,
            hooks: self.hooks,
        })
    }
}
