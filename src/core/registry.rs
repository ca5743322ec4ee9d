//! Graph registry: entity schemas by type name, plus permission resolution

use crate::core::error::{ConfigError, RequestError, RestError, RestResult};
use crate::core::graph::ResolvedGraph;
use crate::core::permission::{Operation, PermissionChains, PermissionRequirement};
use crate::core::schema::{EntityHooks, EntitySchema};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of all exposed entity types
///
/// Pure lookup once the server is running: schemas are shared through `Arc`
/// and never mutated while requests are served.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<EntitySchema>>,
    chains: PermissionChains,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chains(chains: PermissionChains) -> Self {
        Self {
            schemas: HashMap::new(),
            chains,
        }
    }

    /// Register a schema; a schema with the same name is replaced
    pub fn register(&mut self, schema: EntitySchema) {
        self.schemas
            .insert(schema.name().to_string(), Arc::new(schema));
    }

    /// Check that every relation field targets a registered type
    pub fn validate_relations(&self) -> Result<(), ConfigError> {
        for schema in self.schemas.values() {
            for field in schema.fields().filter(|f| f.is_relation()) {
                let related = field.related.as_deref().unwrap_or_default();
                if !self.schemas.contains_key(related) {
                    return Err(ConfigError::schema(
                        schema.name(),
                        format!(
                            "relation '{}' targets unregistered type '{}'",
                            field.name, related
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn schema(&self, entity_type: &str) -> Option<Arc<EntitySchema>> {
        self.schemas.get(entity_type).cloned()
    }

    /// Like [`schema`](Self::schema), failing with an unknown-type request error
    pub fn require(&self, entity_type: &str) -> RestResult<Arc<EntitySchema>> {
        self.schema(entity_type).ok_or_else(|| {
            RestError::Request(RequestError::UnknownEntityType {
                entity_type: entity_type.to_string(),
            })
        })
    }

    pub fn contains(&self, entity_type: &str) -> bool {
        self.schemas.contains_key(entity_type)
    }

    /// Registered type names, sorted
    pub fn entity_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn chains(&self) -> &PermissionChains {
        &self.chains
    }

    /// Resolve a graph of a type, falling back to the raw dump explicitly
    pub fn resolve<'a>(
        &'a self,
        entity_type: &str,
        graph: &'a str,
    ) -> RestResult<ResolvedGraph<'a>> {
        let schema = self.schemas.get(entity_type).ok_or_else(|| {
            RestError::Request(RequestError::UnknownEntityType {
                entity_type: entity_type.to_string(),
            })
        })?;
        Ok(schema.resolve_graph(graph))
    }

    /// Requirement for `operation` on a type, walking the configured fallback chain
    pub fn permissions_for(
        &self,
        entity_type: &str,
        operation: Operation,
    ) -> RestResult<PermissionRequirement> {
        let schema = self.require(entity_type)?;
        Ok(Self::requirement(&self.chains, &schema, operation))
    }

    pub(crate) fn requirement(
        global: &PermissionChains,
        schema: &EntitySchema,
        operation: Operation,
    ) -> PermissionRequirement {
        let chains = schema.chains().unwrap_or(global);
        schema.permissions().resolve(chains.chain(operation))
    }

    /// Hooks of a registered type, for attaching setters/getters after loading YAML
    pub fn hooks_mut(&mut self, entity_type: &str) -> Option<&mut EntityHooks> {
        self.schemas
            .get_mut(entity_type)
            .map(|schema| Arc::make_mut(schema).hooks_mut())
    }
}
