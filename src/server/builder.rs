//! ServerBuilder for fluent API to build HTTP servers

use super::exposure::RestExposure;
use super::host::ServerHost;
use crate::config::{RestConfig, Settings};
use crate::core::auth::{AuthProvider, NoAuthProvider};
use crate::core::error::ConfigError;
use crate::core::registry::SchemaRegistry;
use crate::core::repository::{Repository, RepositorySet};
use crate::core::schema::{EntityHooks, EntitySchema};
use crate::storage::InMemoryRepository;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder for creating HTTP servers exposing registered entity types
///
/// Entity types without an explicit repository are stored in memory.
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(RestConfig::from_yaml_file("rest.yaml")?)?
///     .with_hooks("group", |hooks| hooks.on_get("label", |r| r.value("name").unwrap_or_default()))?
///     .with_auth_provider(TokenAuthProvider::new())
///     .build()?;
/// ```
pub struct ServerBuilder {
    registry: SchemaRegistry,
    repositories: RepositorySet,
    settings: Settings,
    auth: Arc<dyn AuthProvider>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            registry: SchemaRegistry::new(),
            repositories: RepositorySet::new(),
            settings: Settings::default(),
            auth: Arc::new(NoAuthProvider),
            custom_routes: Vec::new(),
        }
    }

    /// Load settings, permission chains and entity types from a config
    ///
    /// Replaces any entity types registered earlier.
    pub fn with_config(mut self, config: RestConfig) -> Result<Self> {
        self.registry = config.to_registry()?;
        self.settings = config.settings;
        Ok(self)
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Register an entity type declared in code
    pub fn register_entity(mut self, schema: EntitySchema) -> Self {
        self.registry.register(schema);
        self
    }

    /// Store an entity type in `repository` instead of memory
    pub fn with_repository(
        mut self,
        entity_type: impl Into<String>,
        repository: impl Repository + 'static,
    ) -> Self {
        self.repositories.register(entity_type, Arc::new(repository));
        self
    }

    /// Attach setter/getter hooks to a registered entity type
    pub fn with_hooks<F>(mut self, entity_type: &str, attach: F) -> Result<Self>
    where
        F: FnOnce(&mut EntityHooks),
    {
        let hooks = self.registry.hooks_mut(entity_type).ok_or_else(|| {
            ConfigError::schema(entity_type, "cannot attach hooks to an unregistered type")
        })?;
        attach(hooks);
        Ok(self)
    }

    pub fn with_auth_provider(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.auth = Arc::new(provider);
        self
    }

    /// Add custom routes to the server
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the transport-agnostic host
    pub fn build_host(mut self) -> Result<ServerHost> {
        for entity_type in self.registry.entity_types() {
            if !self.repositories.contains(entity_type) {
                self.repositories
                    .register(entity_type, Arc::new(InMemoryRepository::new(entity_type)));
            }
        }

        ServerHost::from_builder_components(self.registry, self.repositories, self.settings, self.auth)
    }

    /// Build the final REST router
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);
        RestExposure::build_router(host, custom_routes)
    }

    /// Serve the application with graceful shutdown
    ///
    /// # Example
    ///
    /// ```ignore
    /// ServerBuilder::new()
    ///     .with_config(config)?
    ///     .serve("127.0.0.1:3000").await?;
    /// ```
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
