//! # graph-rest
//!
//! A declarative, graph-based REST exposure layer for persisted entities.
//!
//! ## Features
//!
//! - **Named graphs**: per entity type field projections with aliases,
//!   getter-backed extras and whitelisted relation expansion
//! - **Permission gate**: capability tags per operation class with explicit,
//!   configurable fallback chains
//! - **Never-shown fields**: stripped from every rendering, fallbacks included
//! - **Partial updates**: setter hooks, relation resolution by key and
//!   deep-merge of JSON fields
//! - **Atomic saves**: repositories commit a request's change set as a unit
//! - **Configuration-Based**: declare entity types in YAML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use graph_rest::prelude::*;
//! use serde_json::json;
//!
//! let note = EntitySchema::builder("note")
//!     .field(FieldDef::string("name"))
//!     .field(FieldDef::string("password").with_default(json!("this is hidden")))
//!     .field(FieldDef::json("metadata"))
//!     .never_show("password")
//!     .graph("basic", GraphSpec::new().fields(["id", "name"]))
//!     .permission(Operation::View, ["view_notes", "save_notes"])
//!     .permission(Operation::Save, ["save_notes"])
//!     .build()?;
//!
//! ServerBuilder::new()
//!     .register_entity(note)
//!     .with_auth_provider(TokenAuthProvider::new())
//!     .serve("127.0.0.1:3000")
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{AuthProvider, NoAuthProvider, Principal, TokenAuthProvider},
        dispatcher::{RestDispatcher, RestMethod, RestRequest, RestResponse, StatusCategory},
        error::{
            ConfigError, RequestError, RestError, RestResult, StorageError, ValidationError,
        },
        field::{FieldDef, FieldFormat, FieldKind},
        graph::{GraphSpec, Selector},
        merge::deep_merge,
        mutator::EntityMutator,
        permission::{
            Operation, PermissionChains, PermissionRequirement, PermissionTable, authorize,
        },
        query::{ListQuery, SortSpec},
        record::{ChangeSet, EntityKey, FieldWrite, Record},
        registry::SchemaRegistry,
        repository::{Repository, RepositorySet},
        schema::{EntityHooks, EntitySchema},
        serializer::GraphSerializer,
    };

    // === Storage ===
    pub use crate::storage::InMemoryRepository;

    // === Config ===
    pub use crate::config::{EntityConfig, RestConfig, Settings};

    // === Server ===
    pub use crate::server::{RestExposure, ServerBuilder, ServerHost};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;

    // === Axum ===
    pub use axum::{Router, http::HeaderMap};
}
