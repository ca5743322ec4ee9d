//! Typed error handling for graph-rest
//!
//! Every failure the dispatcher can surface is a [`RestError`]. Each variant
//! carries an HTTP status, a stable machine-checkable code and a human
//! readable message, so clients never receive an unlabeled failure.
//!
//! # Error Categories
//!
//! - [`RestError::NotFound`]: no entity with the requested key
//! - [`RestError::PermissionDenied`]: the permission gate refused the operation
//! - [`RestError::UnsupportedOperation`]: the entity type forbids the operation
//! - [`ValidationError`]: a payload value or setter hook was rejected
//! - [`StorageError`]: the repository failed; nothing was durably applied
//! - [`RequestError`]: malformed key, body, query or method
//! - [`ConfigError`]: schema or YAML configuration problems
//!
//! # Example
//!
//! ```rust,ignore
//! use graph_rest::prelude::*;
//!
//! match dispatcher.execute(request, principal.as_ref()).await {
//!     Ok(document) => println!("{}", document),
//!     Err(RestError::NotFound { entity_type, key }) => {
//!         println!("{} {} not found", entity_type, key);
//!     }
//!     Err(e) => eprintln!("{} ({})", e, e.error_code()),
//! }
//! ```

use crate::core::dispatcher::StatusCategory;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// Result alias used throughout the dispatch pipeline
pub type RestResult<T> = Result<T, RestError>;

/// The main error type of the REST exposure layer
#[derive(Debug)]
pub enum RestError {
    /// No entity of `entity_type` with `key`
    NotFound { entity_type: String, key: String },

    /// The principal does not satisfy the requirement for `operation`
    PermissionDenied {
        entity_type: String,
        operation: String,
    },

    /// The entity type does not allow `operation` at all
    UnsupportedOperation {
        entity_type: String,
        operation: String,
    },

    /// Payload rejected by field checks or a setter hook
    Validation(ValidationError),

    /// Repository failure
    Storage(StorageError),

    /// Malformed request
    Request(RequestError),

    /// Configuration errors
    Config(ConfigError),

    /// Internal errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::NotFound { entity_type, key } => {
                write!(f, "{} with key '{}' not found", entity_type, key)
            }
            RestError::PermissionDenied {
                entity_type,
                operation,
            } => write!(f, "permission denied: {} {}", operation, entity_type),
            RestError::UnsupportedOperation {
                entity_type,
                operation,
            } => write!(f, "{} is not allowed on {}", operation, entity_type),
            RestError::Validation(e) => write!(f, "{}", e),
            RestError::Storage(e) => write!(f, "{}", e),
            RestError::Request(e) => write!(f, "{}", e),
            RestError::Config(e) => write!(f, "{}", e),
            RestError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for RestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RestError::Validation(e) => Some(e),
            RestError::Storage(e) => Some(e),
            RestError::Request(e) => Some(e),
            RestError::Config(e) => Some(e),
            _ => None,
        }
    }
}

/// Structured error body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// HTTP status as an integer
    pub code: u16,
    /// Stable code for programmatic handling
    pub error_code: String,
    /// Whether the request carried an authenticated principal
    pub is_authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl RestError {
    pub fn not_found(entity_type: impl Into<String>, key: impl ToString) -> Self {
        RestError::NotFound {
            entity_type: entity_type.into(),
            key: key.to_string(),
        }
    }

    pub fn denied(entity_type: impl Into<String>, operation: impl Into<String>) -> Self {
        RestError::PermissionDenied {
            entity_type: entity_type.into(),
            operation: operation.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestError::NotFound { .. } => StatusCode::NOT_FOUND,
            RestError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            RestError::UnsupportedOperation { .. } => StatusCode::FORBIDDEN,
            RestError::Validation(_) => StatusCode::BAD_REQUEST,
            RestError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RestError::Request(e) => e.status_code(),
            RestError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            RestError::NotFound { .. } => "ENTITY_NOT_FOUND",
            RestError::PermissionDenied { .. } => "PERMISSION_DENIED",
            RestError::UnsupportedOperation { .. } => "UNSUPPORTED_OPERATION",
            RestError::Validation(e) => e.error_code(),
            RestError::Storage(_) => "STORAGE_ERROR",
            RestError::Request(e) => e.error_code(),
            RestError::Config(_) => "CONFIG_ERROR",
            RestError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_category(&self) -> StatusCategory {
        StatusCategory::from_status(self.status_code())
    }

    /// Convert to an error body
    pub fn to_response(&self, is_authenticated: bool) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.status_code().as_u16(),
            error_code: self.error_code().to_string(),
            is_authenticated,
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            RestError::NotFound { entity_type, key } => Some(serde_json::json!({
                "entity_type": entity_type,
                "key": key
            })),
            RestError::PermissionDenied {
                entity_type,
                operation,
            }
            | RestError::UnsupportedOperation {
                entity_type,
                operation,
            } => Some(serde_json::json!({
                "entity_type": entity_type,
                "operation": operation
            })),
            RestError::Validation(ValidationError::Field { field, .. }) => {
                Some(serde_json::json!({ "field": field }))
            }
            RestError::Validation(ValidationError::MissingRequired { fields }) => {
                Some(serde_json::json!({ "fields": fields }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response(false));
        (status, body).into_response()
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors raised while applying a payload
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A value (or a setter hook) rejected for one field
    #[error("Validation error for field '{field}': {message}")]
    Field { field: String, message: String },

    /// Non-nullable fields left without a value
    #[error("Missing required fields: {}", fields.join(", "))]
    MissingRequired { fields: Vec<String> },
}

impl ValidationError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::Field {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::Field { .. } => "VALIDATION_ERROR",
            ValidationError::MissingRequired { .. } => "MISSING_REQUIRED_FIELDS",
        }
    }
}

impl From<ValidationError> for RestError {
    fn from(err: ValidationError) -> Self {
        RestError::Validation(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors reported by repositories
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("{backend} error: {message}")]
    Backend { backend: String, message: String },

    #[error("{backend} lock poisoned")]
    LockPoisoned { backend: String },

    #[error("Data integrity error: {message}")]
    Integrity { message: String },

    #[error("Storage backend '{backend}' is unavailable")]
    Unavailable { backend: String },

    /// An update targeted a record that is no longer stored
    #[error("{entity_type} '{key}' is no longer stored")]
    Missing { entity_type: String, key: String },
}

impl From<StorageError> for RestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Missing { entity_type, key } => RestError::NotFound { entity_type, key },
            other => RestError::Storage(other),
        }
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Errors related to the shape of an incoming request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestError {
    /// Primary key is not a valid identifier
    InvalidKey { value: String },

    /// Body is not a JSON object
    InvalidBody { message: String },

    /// Query parameter could not be coerced to the field kind
    InvalidQuery { param: String, message: String },

    /// Operation requires a primary key
    MissingKey { operation: String },

    /// No entity type registered under this name
    UnknownEntityType { entity_type: String },

    MethodNotAllowed { method: String },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::InvalidKey { value } => write!(f, "Invalid entity key format: '{}'", value),
            RequestError::InvalidBody { message } => write!(f, "Invalid request body: {}", message),
            RequestError::InvalidQuery { param, message } => {
                write!(f, "Invalid query parameter '{}': {}", param, message)
            }
            RequestError::MissingKey { operation } => {
                write!(f, "{} requires an entity key", operation)
            }
            RequestError::UnknownEntityType { entity_type } => {
                write!(f, "Unknown entity type: {}", entity_type)
            }
            RequestError::MethodNotAllowed { method } => {
                write!(f, "Method not allowed: {}", method)
            }
        }
    }
}

impl std::error::Error for RequestError {}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::UnknownEntityType { .. } => StatusCode::NOT_FOUND,
            RequestError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::InvalidKey { .. } => "INVALID_KEY",
            RequestError::InvalidBody { .. } => "INVALID_BODY",
            RequestError::InvalidQuery { .. } => "INVALID_QUERY",
            RequestError::MissingKey { .. } => "MISSING_KEY",
            RequestError::UnknownEntityType { .. } => "UNKNOWN_ENTITY_TYPE",
            RequestError::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
        }
    }
}

impl From<RequestError> for RestError {
    fn from(err: RequestError) -> Self {
        RestError::Request(err)
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors found while loading or validating schemas
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// An entity declaration is inconsistent
    InvalidSchema { entity_type: String, message: String },

    FileNotFound { path: String },

    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => match file {
                Some(file) => write!(f, "Failed to parse config file '{}': {}", file, message),
                None => write!(f, "Failed to parse config: {}", message),
            },
            ConfigError::InvalidSchema {
                entity_type,
                message,
            } => write!(f, "Invalid schema for '{}': {}", entity_type, message),
            ConfigError::FileNotFound { path } => {
                write!(f, "Configuration file not found: {}", path)
            }
            ConfigError::IoError { message } => write!(f, "IO error: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ConfigError {
    pub fn schema(entity_type: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidSchema {
            entity_type: entity_type.into(),
            message: message.into(),
        }
    }
}

impl From<ConfigError> for RestError {
    fn from(err: ConfigError) -> Self {
        RestError::Config(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for RestError {
    fn from(err: serde_json::Error) -> Self {
        RestError::Request(RequestError::InvalidBody {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for RestError {
    fn from(err: serde_yaml::Error) -> Self {
        RestError::Config(err.into())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for RestError {
    fn from(err: std::io::Error) -> Self {
        RestError::Config(err.into())
    }
}

impl From<uuid::Error> for RestError {
    fn from(err: uuid::Error) -> Self {
        RestError::Request(RequestError::InvalidKey {
            value: err.to_string(),
        })
    }
}

impl From<anyhow::Error> for RestError {
    fn from(err: anyhow::Error) -> Self {
        RestError::Internal(err.to_string())
    }
}
