//! Graph-directed serialization of records into documents
//!
//! A graph lists the selectors to render, the getter-backed extras and the
//! relations to expand (each with its own sub-graph). Relations not listed in
//! the graph are never followed. Fields the entity type marks never-shown are
//! stripped from every rendered level, including the raw fallback used when a
//! graph name is not declared.

use crate::core::error::RestResult;
use crate::core::graph::{GraphSpec, ResolvedGraph, Selector};
use crate::core::record::Record;
use crate::core::registry::SchemaRegistry;
use crate::core::repository::RepositorySet;
use crate::core::schema::EntitySchema;
use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Renders records according to named graphs
#[derive(Clone)]
pub struct GraphSerializer {
    registry: Arc<SchemaRegistry>,
    repositories: RepositorySet,
    max_depth: usize,
}

impl GraphSerializer {
    pub fn new(registry: Arc<SchemaRegistry>, repositories: RepositorySet, max_depth: usize) -> Self {
        Self {
            registry,
            repositories,
            max_depth,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Render one record with `graph`
    pub async fn serialize(&self, record: &Record, graph: &str) -> RestResult<Value> {
        let document = self.render(record, graph, 0).await?;
        Ok(Value::Object(document))
    }

    /// Render records element-wise, keeping their order
    pub async fn serialize_many(&self, records: &[Record], graph: &str) -> RestResult<Value> {
        let documents =
            try_join_all(records.iter().map(|record| self.render(record, graph, 0))).await?;
        Ok(Value::Array(documents.into_iter().map(Value::Object).collect()))
    }

    fn render<'a>(
        &'a self,
        record: &'a Record,
        graph: &'a str,
        depth: usize,
    ) -> BoxFuture<'a, RestResult<Map<String, Value>>> {
        async move {
            let schema = self.registry.require(&record.entity_type)?;

            let mut document = match schema.resolve_graph(graph) {
                ResolvedGraph::Named { spec, .. } => {
                    self.render_named(&schema, spec, record, depth).await?
                }
                ResolvedGraph::RawFallback { requested } => {
                    tracing::debug!(
                        entity_type = %record.entity_type,
                        graph = requested,
                        "graph not declared, rendering raw fields"
                    );
                    raw_fields(record)
                }
            };

            for hidden in schema.never_show() {
                document.remove(hidden);
            }
            Ok(document)
        }
        .boxed()
    }

    async fn render_named(
        &self,
        schema: &EntitySchema,
        spec: &GraphSpec,
        record: &Record,
        depth: usize,
    ) -> RestResult<Map<String, Value>> {
        let mut document = if spec.fields.is_empty() {
            raw_fields(record)
        } else {
            let mut document = Map::new();
            for selector in &spec.fields {
                if let Some(value) = select(schema, record, selector) {
                    document.insert(selector.output_name().to_string(), value);
                }
            }
            document
        };

        for selector in &spec.extra {
            if let Some(value) = select(schema, record, selector) {
                document.insert(selector.output_name().to_string(), value);
            }
        }

        for (relation, sub_graph) in &spec.graphs {
            if schema.is_never_shown(relation) {
                continue;
            }
            let value = self
                .expand_relation(schema, record, relation, sub_graph, depth)
                .await?;
            document.insert(relation.clone(), value);
        }

        Ok(document)
    }

    async fn expand_relation(
        &self,
        schema: &EntitySchema,
        record: &Record,
        relation: &str,
        sub_graph: &str,
        depth: usize,
    ) -> RestResult<Value> {
        let Some(key) = record.relation_key(relation) else {
            return Ok(Value::Null);
        };
        if depth >= self.max_depth {
            return Ok(Value::String(key.to_string()));
        }
        let Some(related_type) = schema.field(relation).and_then(|f| f.related.as_deref()) else {
            return Ok(Value::Null);
        };

        match self.repositories.resolve_related(related_type, &key).await? {
            Some(related) => {
                let nested = self.render(&related, sub_graph, depth + 1).await?;
                Ok(Value::Object(nested))
            }
            None => {
                tracing::debug!(related_type, %key, "related record not found");
                Ok(Value::Null)
            }
        }
    }
}

/// Value of one selector; `None` when the source is hidden or unknown
fn select(schema: &EntitySchema, record: &Record, selector: &Selector) -> Option<Value> {
    let source = selector.source();
    if schema.is_never_shown(source) {
        return None;
    }
    if let Some(getter) = schema.hooks().getter(source) {
        return Some(getter(record));
    }
    if let Some(value) = record.system_value(source) {
        return Some(value);
    }
    match schema.field(source) {
        Some(field) => Some(
            record
                .get(source)
                .cloned()
                .unwrap_or_else(|| field.initial_value()),
        ),
        None => {
            tracing::debug!(entity_type = schema.name(), source, "unknown graph selector");
            None
        }
    }
}

/// System values plus every stored field
fn raw_fields(record: &Record) -> Map<String, Value> {
    let mut document = Map::new();
    for name in ["id", "created", "modified"] {
        if let Some(value) = record.system_value(name) {
            document.insert(name.to_string(), value);
        }
    }
    for (name, value) in &record.fields {
        document.insert(name.clone(), value.clone());
    }
    document
}
