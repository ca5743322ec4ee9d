//! Server host for transport-agnostic API exposure
//!
//! The host holds everything needed to answer requests: the schema registry,
//! the repositories, the auth provider and the dispatcher built on them. It
//! knows nothing about HTTP; exposures such as [`RestExposure`] consume it.
//!
//! [`RestExposure`]: crate::server::exposure::RestExposure

use crate::config::Settings;
use crate::core::auth::AuthProvider;
use crate::core::dispatcher::RestDispatcher;
use crate::core::error::ConfigError;
use crate::core::registry::SchemaRegistry;
use crate::core::repository::RepositorySet;
use anyhow::Result;
use std::sync::Arc;

/// Host context containing all framework state
///
/// # Example
///
/// ```rust,ignore
/// let host = ServerHost::from_builder_components(registry, repositories, settings, auth)?;
/// let app = RestExposure::build_router(Arc::new(host), vec![])?;
/// ```
pub struct ServerHost {
    /// Registered entity schemas
    pub registry: Arc<SchemaRegistry>,

    /// One repository per registered entity type
    pub repositories: RepositorySet,

    /// Resolves the principal of each request
    pub auth: Arc<dyn AuthProvider>,

    pub dispatcher: RestDispatcher,
}

impl ServerHost {
    /// Build the host, checking that every entity type can be stored
    pub fn from_builder_components(
        registry: SchemaRegistry,
        repositories: RepositorySet,
        settings: Settings,
        auth: Arc<dyn AuthProvider>,
    ) -> Result<Self> {
        settings.validate()?;
        registry.validate_relations()?;
        for entity_type in registry.entity_types() {
            if !repositories.contains(entity_type) {
                return Err(ConfigError::schema(entity_type, "no repository registered").into());
            }
        }

        let registry = Arc::new(registry);
        let dispatcher = RestDispatcher::new(registry.clone(), repositories.clone(), settings);

        Ok(Self {
            registry,
            repositories,
            auth,
            dispatcher,
        })
    }

    /// Get entity types registered in the host
    pub fn entity_types(&self) -> Vec<&str> {
        self.registry.entity_types()
    }

    /// Check if host exposes at least one entity type
    pub fn is_ready(&self) -> bool {
        !self.registry.entity_types().is_empty()
    }
}
