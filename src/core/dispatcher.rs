//! REST dispatcher: routes requests through the permission gate into
//! list/get/create/update/delete flows
//!
//! Every flow authorizes before it touches a repository. A denied request
//! never reads or writes storage and answers with a forbidden error naming the
//! entity type and the action.

use crate::config::Settings;
use crate::core::auth::Principal;
use crate::core::error::{RequestError, RestError, RestResult};
use crate::core::mutator::EntityMutator;
use crate::core::permission::{Operation, authorize};
use crate::core::query::{ListQuery, Window};
use crate::core::record::{EntityKey, Record};
use crate::core::registry::SchemaRegistry;
use crate::core::repository::RepositorySet;
use crate::core::schema::EntitySchema;
use crate::core::serializer::GraphSerializer;
use axum::Json;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Methods the dispatcher understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl TryFrom<&Method> for RestMethod {
    type Error = RequestError;

    fn try_from(method: &Method) -> Result<Self, Self::Error> {
        match *method {
            Method::GET => Ok(RestMethod::Get),
            Method::POST => Ok(RestMethod::Post),
            Method::PUT => Ok(RestMethod::Put),
            Method::DELETE => Ok(RestMethod::Delete),
            _ => Err(RequestError::MethodNotAllowed {
                method: method.to_string(),
            }),
        }
    }
}

/// Flow selected by (method, has key)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn route(method: RestMethod, has_key: bool) -> Self {
        match (method, has_key) {
            (RestMethod::Get, false) => Action::List,
            (RestMethod::Get, true) => Action::Get,
            (RestMethod::Post | RestMethod::Put, false) => Action::Create,
            (RestMethod::Post | RestMethod::Put, true) => Action::Update,
            (RestMethod::Delete, _) => Action::Delete,
        }
    }

    /// Operation class whose requirement gates this action
    pub fn operation(&self) -> Operation {
        match self {
            Action::List | Action::Get => Operation::View,
            Action::Create | Action::Update => Operation::Save,
            Action::Delete => Operation::Delete,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Get => "get",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Transport-agnostic request
#[derive(Debug, Clone)]
pub struct RestRequest {
    pub method: RestMethod,
    pub entity_type: String,
    pub key: Option<String>,
    /// Parsed body; `Null` when the request had none
    pub body: Value,
    pub query: HashMap<String, String>,
    pub graph: Option<String>,
}

impl RestRequest {
    pub fn new(method: RestMethod, entity_type: impl Into<String>) -> Self {
        Self {
            method,
            entity_type: entity_type.into(),
            key: None,
            body: Value::Null,
            query: HashMap::new(),
            graph: None,
        }
    }

    pub fn with_key(mut self, key: impl ToString) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_graph(mut self, graph: impl Into<String>) -> Self {
        self.graph = Some(graph.into());
        self
    }

    /// Graph named by the request, explicitly or through the `graph` parameter
    pub fn requested_graph(&self) -> Option<&str> {
        self.graph
            .as_deref()
            .or_else(|| self.query.get("graph").map(String::as_str))
    }
}

/// Coarse outcome of a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusCategory {
    Ok,
    NotFound,
    Forbidden,
    BadRequest,
    ServerError,
}

impl StatusCategory {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            s if s.is_success() => StatusCategory::Ok,
            StatusCode::NOT_FOUND => StatusCategory::NotFound,
            StatusCode::FORBIDDEN => StatusCategory::Forbidden,
            s if s.is_client_error() => StatusCategory::BadRequest,
            _ => StatusCategory::ServerError,
        }
    }
}

/// Outcome of a dispatch: a document or a structured error body
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: StatusCategory,
    pub http_status: StatusCode,
    pub body: Value,
}

impl RestResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCategory::Ok,
            http_status: StatusCode::OK,
            body,
        }
    }

    pub fn from_error(error: &RestError, is_authenticated: bool) -> Self {
        let body = serde_json::to_value(error.to_response(is_authenticated)).unwrap_or_else(|_| {
            json!({
                "error": error.to_string(),
                "code": error.status_code().as_u16(),
            })
        });
        Self {
            status: error.status_category(),
            http_status: error.status_code(),
            body,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == StatusCategory::Ok
    }
}

impl IntoResponse for RestResponse {
    fn into_response(self) -> Response {
        (self.http_status, Json(self.body)).into_response()
    }
}

/// Request-scoped dispatch over the registered entity types
#[derive(Clone)]
pub struct RestDispatcher {
    registry: Arc<SchemaRegistry>,
    repositories: RepositorySet,
    serializer: GraphSerializer,
    mutator: EntityMutator,
    settings: Settings,
}

impl RestDispatcher {
    pub fn new(registry: Arc<SchemaRegistry>, repositories: RepositorySet, settings: Settings) -> Self {
        let serializer = GraphSerializer::new(
            registry.clone(),
            repositories.clone(),
            settings.max_graph_depth,
        );
        let mutator = EntityMutator::new(repositories.clone());
        Self {
            registry,
            repositories,
            serializer,
            mutator,
            settings,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn serializer(&self) -> &GraphSerializer {
        &self.serializer
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Dispatch a request; failures become structured error responses
    pub async fn dispatch(&self, request: RestRequest, principal: Option<&Principal>) -> RestResponse {
        let entity_type = request.entity_type.clone();
        match self.execute(request, principal).await {
            Ok(body) => RestResponse::ok(body),
            Err(error) => {
                if error.status_category() == StatusCategory::ServerError {
                    tracing::error!(entity_type = %entity_type, error = %error, "request failed");
                }
                RestResponse::from_error(&error, principal.is_some())
            }
        }
    }

    /// Dispatch a request, returning the success document or the error
    pub async fn execute(
        &self,
        request: RestRequest,
        principal: Option<&Principal>,
    ) -> RestResult<Value> {
        let schema = self.registry.require(&request.entity_type)?;
        let action = Action::route(request.method, request.key.is_some());
        tracing::debug!(
            entity_type = schema.name(),
            action = action.name(),
            key = request.key.as_deref(),
            "dispatching request"
        );

        match action {
            Action::List => self.list(&schema, &request, principal).await,
            Action::Get => self.get(&schema, &request, principal).await,
            Action::Create => self.create(&schema, &request, principal).await,
            Action::Update => self.update(&schema, &request, principal).await,
            Action::Delete => self.delete(&schema, &request, principal).await,
        }
    }

    fn authorize(
        &self,
        schema: &EntitySchema,
        action: Action,
        principal: Option<&Principal>,
    ) -> RestResult<()> {
        let requirement =
            SchemaRegistry::requirement(self.registry.chains(), schema, action.operation());
        if authorize(principal, &requirement) {
            return Ok(());
        }
        tracing::warn!(
            entity_type = schema.name(),
            action = action.name(),
            principal = principal.map(|p| p.id.as_str()),
            "permission denied"
        );
        Err(RestError::denied(schema.name(), action.name()))
    }

    async fn list(
        &self,
        schema: &EntitySchema,
        request: &RestRequest,
        principal: Option<&Principal>,
    ) -> RestResult<Value> {
        self.authorize(schema, Action::List, principal)?;

        let query = ListQuery::build(schema, &request.query, &self.settings)?;
        let window = Window::from_params(&request.query, &self.settings)?;
        let graph = request
            .requested_graph()
            .unwrap_or(self.settings.default_list_graph.as_str());

        let repository = self.repositories.require(schema.name())?;
        let records = repository.list(&query).await?;
        let count = records.len();
        let page = window.apply(records);
        let data = self.serializer.serialize_many(&page, graph).await?;

        Ok(json!({
            "status": true,
            "data": data,
            "count": count,
            "size": window.size,
            "start": window.start,
            "graph": graph,
        }))
    }

    async fn get(
        &self,
        schema: &EntitySchema,
        request: &RestRequest,
        principal: Option<&Principal>,
    ) -> RestResult<Value> {
        self.authorize(schema, Action::Get, principal)?;
        let record = self.load(schema, request).await?;
        self.single(&record, request).await
    }

    async fn create(
        &self,
        schema: &EntitySchema,
        request: &RestRequest,
        principal: Option<&Principal>,
    ) -> RestResult<Value> {
        self.authorize(schema, Action::Create, principal)?;
        let payload = payload(request)?;
        let saved = self.mutator.create(schema, &payload).await?;
        tracing::debug!(entity_type = schema.name(), key = %saved.id, "created");
        self.single(&saved, request).await
    }

    async fn update(
        &self,
        schema: &EntitySchema,
        request: &RestRequest,
        principal: Option<&Principal>,
    ) -> RestResult<Value> {
        self.authorize(schema, Action::Update, principal)?;
        let payload = payload(request)?;
        let instance = self.load(schema, request).await?;
        let saved = self.mutator.update(schema, instance, &payload).await?;
        self.single(&saved, request).await
    }

    async fn delete(
        &self,
        schema: &EntitySchema,
        request: &RestRequest,
        principal: Option<&Principal>,
    ) -> RestResult<Value> {
        if !schema.can_delete() {
            return Err(RestError::UnsupportedOperation {
                entity_type: schema.name().to_string(),
                operation: Action::Delete.name().to_string(),
            });
        }
        self.authorize(schema, Action::Delete, principal)?;

        let record = self.load(schema, request).await?;
        let repository = self.repositories.require(schema.name())?;
        repository.delete(&record).await?;

        Ok(json!({ "status": "deleted", "id": record.id.to_string() }))
    }

    async fn load(&self, schema: &EntitySchema, request: &RestRequest) -> RestResult<Record> {
        let key = parse_key(request)?;
        let repository = self.repositories.require(schema.name())?;
        repository
            .get_by_key(&key)
            .await?
            .ok_or_else(|| RestError::not_found(schema.name(), key))
    }

    async fn single(&self, record: &Record, request: &RestRequest) -> RestResult<Value> {
        let graph = request
            .requested_graph()
            .unwrap_or(self.settings.default_get_graph.as_str());
        let data = self.serializer.serialize(record, graph).await?;
        Ok(json!({ "status": true, "data": data, "graph": graph }))
    }
}

fn parse_key(request: &RestRequest) -> RestResult<EntityKey> {
    let raw = request.key.as_deref().ok_or_else(|| RequestError::MissingKey {
        operation: Action::route(request.method, false).name().to_string(),
    })?;
    EntityKey::parse_str(raw.trim()).map_err(|_| {
        RequestError::InvalidKey {
            value: raw.to_string(),
        }
        .into()
    })
}

fn payload(request: &RestRequest) -> RestResult<Map<String, Value>> {
    match &request.body {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        other => Err(RequestError::InvalidBody {
            message: format!("expected a JSON object, got {}", kind_of(other)),
        }
        .into()),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_table() {
        assert_eq!(Action::route(RestMethod::Get, false), Action::List);
        assert_eq!(Action::route(RestMethod::Get, true), Action::Get);
        assert_eq!(Action::route(RestMethod::Post, false), Action::Create);
        assert_eq!(Action::route(RestMethod::Put, true), Action::Update);
        assert_eq!(Action::route(RestMethod::Delete, true), Action::Delete);
        assert_eq!(Action::route(RestMethod::Delete, false), Action::Delete);
    }

    #[test]
    fn test_action_operations() {
        assert_eq!(Action::List.operation(), Operation::View);
        assert_eq!(Action::Update.operation(), Operation::Save);
        assert_eq!(Action::Delete.operation(), Operation::Delete);
        assert_eq!(Action::Create.to_string(), "create");
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(RestMethod::try_from(&Method::PUT), Ok(RestMethod::Put));
        assert!(RestMethod::try_from(&Method::PATCH).is_err());
    }

    #[test]
    fn test_status_category() {
        assert_eq!(StatusCategory::from_status(StatusCode::OK), StatusCategory::Ok);
        assert_eq!(
            StatusCategory::from_status(StatusCode::NOT_FOUND),
            StatusCategory::NotFound
        );
        assert_eq!(
            StatusCategory::from_status(StatusCode::UNPROCESSABLE_ENTITY),
            StatusCategory::BadRequest
        );
        assert_eq!(
            StatusCategory::from_status(StatusCode::BAD_GATEWAY),
            StatusCategory::ServerError
        );
    }

    #[test]
    fn test_requested_graph() {
        let request = RestRequest::new(RestMethod::Get, "todo").with_query("graph", "basic");
        assert_eq!(request.requested_graph(), Some("basic"));
        let request = request.with_graph("default");
        assert_eq!(request.requested_graph(), Some("default"));
        assert_eq!(RestRequest::new(RestMethod::Get, "todo").requested_graph(), None);
    }

    #[test]
    fn test_parse_key() {
        let key = uuid::Uuid::new_v4();
        let request = RestRequest::new(RestMethod::Get, "todo").with_key(key);
        assert_eq!(parse_key(&request).expect("valid key"), key);

        let bad = RestRequest::new(RestMethod::Get, "todo").with_key("12");
        assert_eq!(parse_key(&bad).unwrap_err().error_code(), "INVALID_KEY");

        let missing = RestRequest::new(RestMethod::Delete, "todo");
        assert_eq!(parse_key(&missing).unwrap_err().error_code(), "MISSING_KEY");
    }

    #[test]
    fn test_payload_must_be_object() {
        let request = RestRequest::new(RestMethod::Post, "todo").with_body(json!([1]));
        assert_eq!(payload(&request).unwrap_err().error_code(), "INVALID_BODY");
        let empty = RestRequest::new(RestMethod::Post, "todo");
        assert!(payload(&empty).expect("null body").is_empty());
    }

    #[test]
    fn test_error_response_shape() {
        let response = RestResponse::from_error(&RestError::denied("note", "get"), false);
        assert_eq!(response.status, StatusCategory::Forbidden);
        assert_eq!(response.http_status, StatusCode::FORBIDDEN);
        assert_eq!(response.body["code"], 403);
        assert_eq!(response.body["is_authenticated"], false);
        assert!(!response.is_ok());
    }
}
