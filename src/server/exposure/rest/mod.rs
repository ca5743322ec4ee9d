//! REST API exposure
//!
//! Maps HTTP onto the transport-agnostic dispatcher:
//! - `/{entity_type}`: list (GET) and create (POST, PUT)
//! - `/{entity_type}/{key}`: get, update and delete
//!
//! The exposure consumes a `ServerHost` and produces an Axum `Router`.

use super::super::host::ServerHost;
use crate::core::dispatcher::{RestMethod, RestRequest};
use crate::core::error::RestError;
use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::any, routing::get};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// REST API exposure implementation
pub struct RestExposure;

impl RestExposure {
    /// Build the REST router from a host
    ///
    /// Returns a router with health check routes, the entity routes and any
    /// custom routes merged in.
    pub fn build_router(host: Arc<ServerHost>, custom_routes: Vec<Router>) -> Result<Router> {
        let entity_routes = Router::new()
            .route("/{entity_type}", any(Self::collection))
            .route("/{entity_type}/{key}", any(Self::member))
            .with_state(host);

        let mut app = Self::health_routes().merge(entity_routes);

        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

        Ok(app.layer(cors).layer(TraceLayer::new_for_http()))
    }

    /// Build health check routes
    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    /// Health check endpoint handler
    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "graph-rest"
        }))
    }

    async fn collection(
        State(host): State<Arc<ServerHost>>,
        Path(entity_type): Path<String>,
        method: Method,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
        body: Bytes,
    ) -> Response {
        Self::handle(&host, entity_type, None, method, headers, query, body).await
    }

    async fn member(
        State(host): State<Arc<ServerHost>>,
        Path((entity_type, key)): Path<(String, String)>,
        method: Method,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
        body: Bytes,
    ) -> Response {
        Self::handle(&host, entity_type, Some(key), method, headers, query, body).await
    }

    async fn handle(
        host: &ServerHost,
        entity_type: String,
        key: Option<String>,
        method: Method,
        headers: HeaderMap,
        query: HashMap<String, String>,
        body: Bytes,
    ) -> Response {
        let method = match RestMethod::try_from(&method) {
            Ok(method) => method,
            Err(e) => return RestError::from(e).into_response(),
        };

        let body = match parse_body(&body) {
            Ok(body) => body,
            Err(e) => return e.into_response(),
        };

        let principal = match host.auth.current_principal(&headers).await {
            Ok(principal) => principal,
            Err(e) => {
                tracing::error!(error = %e, "auth provider failed");
                return RestError::from(e).into_response();
            }
        };

        let graph = query.get("graph").cloned();
        let request = RestRequest {
            method,
            entity_type,
            key,
            body,
            query,
            graph,
        };

        host.dispatcher
            .dispatch(request, principal.as_ref())
            .await
            .into_response()
    }
}

/// Empty bodies parse as `null`
fn parse_body(bytes: &Bytes) -> Result<Value, RestError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::FieldDef;
    use crate::core::schema::EntitySchema;
    use crate::server::ServerBuilder;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        ServerBuilder::new()
            .register_entity(
                EntitySchema::builder("todo")
                    .field(FieldDef::string("name"))
                    .build()
                    .expect("valid todo"),
            )
            .build()
            .expect("router should build")
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        serde_json::from_slice(&bytes).expect("body should be json")
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = app()
            .oneshot(Request::get("/healthz").body(Body::empty()).expect("request"))
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_route() {
        let request = Request::post("/todo")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"A"}"#))
            .expect("request");
        let response = app().oneshot(request).await.expect("infallible");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], true);
        assert_eq!(body["data"]["name"], "A");
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let request = Request::patch("/todo").body(Body::empty()).expect("request");
        let response = app().oneshot(request).await.expect("infallible");
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_json(response).await["error_code"], "METHOD_NOT_ALLOWED");
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(&Bytes::new()).expect("empty"), Value::Null);
        assert_eq!(parse_body(&Bytes::from_static(b"  \n")).expect("blank"), Value::Null);
        assert_eq!(
            parse_body(&Bytes::from_static(br#"{"name":"A"}"#)).expect("object"),
            json!({"name": "A"})
        );
        let err = parse_body(&Bytes::from_static(b"{oops")).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_BODY");
    }
}
