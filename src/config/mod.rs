//! Configuration loading and management

use crate::core::error::ConfigError;
use crate::core::field::FieldDef;
use crate::core::graph::GraphSpec;
use crate::core::permission::{PermissionChains, PermissionTable};
use crate::core::registry::SchemaRegistry;
use crate::core::schema::EntitySchema;
use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_list_size() -> usize {
    10
}

fn default_max_list_size() -> usize {
    100
}

fn default_max_graph_depth() -> usize {
    4
}

fn default_list_graph() -> String {
    "list".to_string()
}

fn default_get_graph() -> String {
    "default".to_string()
}

fn default_sort() -> String {
    "-id".to_string()
}

/// Dispatcher-wide defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Page size when the request gives no `size`
    #[serde(default = "default_list_size")]
    pub default_list_size: usize,

    /// Upper bound for a requested `size`
    #[serde(default = "default_max_list_size")]
    pub max_list_size: usize,

    /// Relation nesting level past which relations render as their key
    #[serde(default = "default_max_graph_depth")]
    pub max_graph_depth: usize,

    /// Graph used by list when the request names none
    #[serde(default = "default_list_graph")]
    pub default_list_graph: String,

    /// Graph used by get/create/update when the request names none
    #[serde(default = "default_get_graph")]
    pub default_get_graph: String,

    /// Sort applied when the request gives no valid `sort`
    #[serde(default = "default_sort")]
    pub default_sort: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_list_size: default_list_size(),
            max_list_size: default_max_list_size(),
            max_graph_depth: default_max_graph_depth(),
            default_list_graph: default_list_graph(),
            default_get_graph: default_get_graph(),
            default_sort: default_sort(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_list_size == 0 {
            return Err(ConfigError::ParseError {
                file: None,
                message: "max_list_size must be at least 1".to_string(),
            });
        }
        if self.default_list_size == 0 || self.default_list_size > self.max_list_size {
            return Err(ConfigError::ParseError {
                file: None,
                message: format!(
                    "default_list_size must be between 1 and {}",
                    self.max_list_size
                ),
            });
        }
        Ok(())
    }
}

/// Declarative description of one entity type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,

    pub fields: Vec<FieldDef>,

    #[serde(default)]
    pub graphs: IndexMap<String, GraphSpec>,

    /// Fields never rendered, whatever the graph
    #[serde(default)]
    pub never_show: Vec<String>,

    #[serde(default)]
    pub can_delete: bool,

    #[serde(default)]
    pub permissions: PermissionTable,

    /// Overrides the global fallback chains for this type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_chains: Option<PermissionChains>,

    #[serde(default)]
    pub list_default_filters: IndexMap<String, Value>,
}

impl EntityConfig {
    pub fn to_schema(&self) -> Result<EntitySchema, ConfigError> {
        let mut builder = EntitySchema::builder(self.name.clone())
            .fields(self.fields.iter().cloned())
            .permissions(self.permissions.clone())
            .can_delete(self.can_delete);

        for (name, spec) in &self.graphs {
            builder = builder.graph(name.clone(), spec.clone());
        }
        for field in &self.never_show {
            builder = builder.never_show(field.clone());
        }
        for (field, value) in &self.list_default_filters {
            builder = builder.default_filter(field.clone(), value.clone());
        }
        if let Some(chains) = &self.permission_chains {
            builder = builder.chains(chains.clone());
        }

        builder.build()
    }
}

/// Complete configuration of the REST exposure layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestConfig {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub permission_chains: PermissionChains,

    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

impl RestConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        if !std::path::Path::new(path).exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string(),
            }
            .into());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.to_string()),
            message: e.to_string(),
        })?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Build and cross-check the schema registry described by this config
    pub fn to_registry(&self) -> Result<SchemaRegistry, ConfigError> {
        self.settings.validate()?;

        let mut registry = SchemaRegistry::with_chains(self.permission_chains.clone());
        for entity in &self.entities {
            if registry.contains(&entity.name) {
                return Err(ConfigError::schema(
                    entity.name.clone(),
                    "entity type declared twice",
                ));
            }
            registry.register(entity.to_schema()?);
        }
        registry.validate_relations()?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::permission::Operation;
    use serde_json::json;

    const YAML: &str = r#"
settings:
  default_list_size: 5
permission_chains:
  delete: [delete]
entities:
  - name: note
    fields:
      - { name: name, kind: string }
      - { name: password, kind: string, default: "this is hidden" }
      - { name: metadata, kind: json }
    never_show: [password]
    permissions:
      view: [view_notes, save_notes]
      save: [save_notes]
    graphs:
      basic:
        fields: [id, name]
  - name: todo
    fields:
      - { name: name, kind: string }
      - { name: note, kind: relation, related: note }
    can_delete: true
    graphs:
      default:
        fields: [id, name, note]
        graphs:
          note: basic
"#;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.default_list_size, 10);
        assert_eq!(settings.max_list_size, 100);
        assert_eq!(settings.default_list_graph, "list");
        assert_eq!(settings.default_get_graph, "default");
        assert_eq!(settings.default_sort, "-id");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_yaml_to_registry() {
        let config = RestConfig::from_yaml_str(YAML).expect("config should parse");
        assert_eq!(config.settings.default_list_size, 5);
        assert_eq!(config.settings.max_list_size, 100);

        let registry = config.to_registry().expect("registry should build");
        assert_eq!(registry.entity_types(), vec!["note", "todo"]);

        let note = registry.schema("note").expect("note");
        assert!(note.is_never_shown("password"));
        assert!(!note.can_delete());
        assert_eq!(note.new_record().get("password"), Some(&json!("this is hidden")));

        let delete = registry
            .permissions_for("note", Operation::Delete)
            .expect("known type");
        assert!(delete.is_unrestricted());
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let mut config = RestConfig::from_yaml_str(YAML).expect("config should parse");
        let again = config.entities[0].clone();
        config.entities.push(again);
        let err = config.to_registry().unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut config = RestConfig::default();
        config.settings.default_list_size = 500;
        assert!(config.to_registry().is_err());
    }

    #[test]
    fn test_unknown_relation_target_rejected() {
        let config = RestConfig::from_yaml_str(
            "entities:\n  - name: todo\n    fields:\n      - { name: note, kind: relation, related: note }\n",
        )
        .expect("config should parse");
        let err = config.to_registry().unwrap_err();
        assert!(err.to_string().contains("unregistered type"));
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rest.yaml");
        std::fs::write(&path, YAML).expect("write config");

        let config =
            RestConfig::from_yaml_file(path.to_str().expect("utf-8 path")).expect("load file");
        assert_eq!(config.entities.len(), 2);

        assert!(RestConfig::from_yaml_file("/definitely/not/here.yaml").is_err());
    }
}
