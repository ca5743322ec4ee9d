//! Graph declarations: named field projections of an entity type

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One output entry of a graph
///
/// In YAML a selector is either a plain name (`name`) or a two element list
/// `[source, alias]` where `source` is a field or a registered getter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    Field(String),
    Alias(String, String),
}

impl Selector {
    pub fn aliased(source: impl Into<String>, alias: impl Into<String>) -> Self {
        Selector::Alias(source.into(), alias.into())
    }

    /// Field or getter the value is read from
    pub fn source(&self) -> &str {
        match self {
            Selector::Field(name) => name,
            Selector::Alias(source, _) => source,
        }
    }

    /// Key the value is written under
    pub fn output_name(&self) -> &str {
        match self {
            Selector::Field(name) => name,
            Selector::Alias(_, alias) => alias,
        }
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::Field(name.to_string())
    }
}

impl From<(&str, &str)> for Selector {
    fn from((source, alias): (&str, &str)) -> Self {
        Selector::aliased(source, alias)
    }
}

/// A named projection of an entity type
///
/// An empty `fields` list renders every stored field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSpec {
    #[serde(default)]
    pub fields: Vec<Selector>,

    /// Getter-backed entries, only rendered because the graph lists them
    #[serde(default)]
    pub extra: Vec<Selector>,

    /// Relation field -> sub-graph used to expand the related entity
    #[serde(default)]
    pub graphs: IndexMap<String, String>,
}

impl GraphSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selector>,
    {
        self.fields.extend(selectors.into_iter().map(Into::into));
        self
    }

    pub fn extra(mut self, selector: impl Into<Selector>) -> Self {
        self.extra.push(selector.into());
        self
    }

    pub fn relation(mut self, field: impl Into<String>, sub_graph: impl Into<String>) -> Self {
        self.graphs.insert(field.into(), sub_graph.into());
        self
    }

    /// Every selector the graph renders, fields first
    pub fn selectors(&self) -> impl Iterator<Item = &Selector> {
        self.fields.iter().chain(self.extra.iter())
    }
}

/// Outcome of resolving a graph name against an entity type
#[derive(Debug, Clone, Copy)]
pub enum ResolvedGraph<'a> {
    /// The entity type declares the requested graph
    Named { name: &'a str, spec: &'a GraphSpec },
    /// No graph by that name: raw field dump, no relation expansion
    RawFallback { requested: &'a str },
}

impl ResolvedGraph<'_> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ResolvedGraph::RawFallback { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_names() {
        let plain = Selector::from("name");
        assert_eq!(plain.source(), "name");
        assert_eq!(plain.output_name(), "name");

        let alias = Selector::from(("display_label", "label"));
        assert_eq!(alias.source(), "display_label");
        assert_eq!(alias.output_name(), "label");
    }

    #[test]
    fn test_graph_builder() {
        let graph = GraphSpec::new()
            .fields(["id", "name"])
            .extra(("summary", "short"))
            .relation("note", "basic");

        let outputs: Vec<&str> = graph.selectors().map(Selector::output_name).collect();
        assert_eq!(outputs, vec!["id", "name", "short"]);
        assert_eq!(graph.graphs.get("note").map(String::as_str), Some("basic"));
    }

    #[test]
    fn test_graph_yaml_selectors() {
        let graph: GraphSpec = serde_yaml::from_str(
            "fields: [id, name, [kind, category]]\nextra: [summary]\ngraphs:\n  parent: basic\n",
        )
        .expect("graph should parse");

        assert_eq!(graph.fields.len(), 3);
        assert_eq!(graph.fields[2], Selector::aliased("kind", "category"));
        assert_eq!(graph.extra, vec![Selector::from("summary")]);
        assert_eq!(graph.graphs["parent"], "basic");
    }
}
