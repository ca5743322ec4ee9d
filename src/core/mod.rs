//! Core module: schemas, graphs, permissions and the dispatch pipeline

pub mod auth;
pub mod dispatcher;
pub mod error;
pub mod field;
pub mod graph;
pub mod merge;
pub mod mutator;
pub mod permission;
pub mod query;
pub mod record;
pub mod registry;
pub mod repository;
pub mod schema;
pub mod serializer;

pub use auth::{AuthProvider, NoAuthProvider, Principal, TokenAuthProvider};
pub use dispatcher::{RestDispatcher, RestMethod, RestRequest, RestResponse, StatusCategory};
pub use error::{RestError, RestResult};
pub use field::{FieldDef, FieldFormat, FieldKind};
pub use graph::{GraphSpec, ResolvedGraph, Selector};
pub use mutator::EntityMutator;
pub use permission::{Operation, PermissionChains, PermissionRequirement, PermissionTable};
pub use record::{ChangeSet, EntityKey, Record};
pub use registry::SchemaRegistry;
pub use repository::{Repository, RepositorySet};
pub use schema::{EntityHooks, EntitySchema};
pub use serializer::GraphSerializer;
