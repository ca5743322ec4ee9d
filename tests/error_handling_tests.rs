//! Tests for the typed error handling system
//!
//! These tests verify that:
//! - Errors return correct HTTP status codes and status categories
//! - Error bodies carry a stable code, the status and the auth flag
//! - Error conversions work correctly
//! - Error matching allows clients to handle specific cases

use axum::http::StatusCode;
use axum::response::IntoResponse;
use graph_rest::prelude::*;
use uuid::Uuid;

// =============================================================================
// HTTP Status Code Tests
// =============================================================================

mod status_code_tests {
    use super::*;

    #[test]
    fn test_not_found_returns_404() {
        let err = RestError::not_found("todo", Uuid::new_v4());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.status_category(), StatusCategory::NotFound);
    }

    #[test]
    fn test_permission_denied_returns_403() {
        let err = RestError::denied("note", "update");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.status_category(), StatusCategory::Forbidden);
    }

    #[test]
    fn test_unsupported_operation_returns_403() {
        let err = RestError::UnsupportedOperation {
            entity_type: "todo".to_string(),
            operation: "delete".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_validation_errors_return_400() {
        let field = RestError::Validation(ValidationError::field("name", "may not be blank"));
        assert_eq!(field.status_code(), StatusCode::BAD_REQUEST);

        let missing = RestError::Validation(ValidationError::MissingRequired {
            fields: vec!["name".to_string()],
        });
        assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.status_category(), StatusCategory::BadRequest);
    }

    #[test]
    fn test_storage_error_returns_500() {
        let err = RestError::Storage(StorageError::Backend {
            backend: "memory".to_string(),
            message: "disk on fire".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.status_category(), StatusCategory::ServerError);
    }

    #[test]
    fn test_request_errors() {
        let cases = [
            (
                RequestError::InvalidKey {
                    value: "42".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                RequestError::MissingKey {
                    operation: "delete".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                RequestError::UnknownEntityType {
                    entity_type: "ghost".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                RequestError::MethodNotAllowed {
                    method: "PATCH".to_string(),
                },
                StatusCode::METHOD_NOT_ALLOWED,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(RestError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_method_not_allowed_is_bad_request_category() {
        let err = RestError::from(RequestError::MethodNotAllowed {
            method: "PATCH".to_string(),
        });
        assert_eq!(err.status_category(), StatusCategory::BadRequest);
    }
}

// =============================================================================
// Error Code Tests
// =============================================================================

mod error_code_tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(RestError::not_found("todo", "k").error_code(), "ENTITY_NOT_FOUND");
        assert_eq!(RestError::denied("todo", "get").error_code(), "PERMISSION_DENIED");
        assert_eq!(
            RestError::from(ValidationError::field("name", "bad")).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            RestError::from(StorageError::Integrity {
                message: "x".to_string()
            })
            .error_code(),
            "STORAGE_ERROR"
        );
        assert_eq!(
            RestError::Internal("boom".to_string()).error_code(),
            "INTERNAL_ERROR"
        );
    }
}

// =============================================================================
// Error Response Format Tests
// =============================================================================

mod error_response_tests {
    use super::*;

    #[test]
    fn test_error_response_has_code_and_message() {
        let err = RestError::not_found("todo", Uuid::nil());

        let response = err.to_response(false);

        assert_eq!(response.code, 404);
        assert_eq!(response.error_code, "ENTITY_NOT_FOUND");
        assert!(response.error.contains("todo"));
        assert!(response.error.contains("not found"));
        assert!(!response.is_authenticated);
    }

    #[test]
    fn test_denial_names_type_and_operation() {
        let response = RestError::denied("note", "update").to_response(true);

        assert!(response.is_authenticated);
        assert!(response.error.contains("note"));
        assert!(response.error.contains("update"));
        let details = response.details.expect("details");
        assert_eq!(details["entity_type"], "note");
        assert_eq!(details["operation"], "update");
    }

    #[test]
    fn test_missing_required_lists_fields() {
        let err = RestError::from(ValidationError::MissingRequired {
            fields: vec!["name".to_string(), "kind".to_string()],
        });

        let response = err.to_response(false);

        assert!(response.error.contains("name, kind"));
        let details = response.details.expect("details");
        assert_eq!(details["fields"].as_array().expect("array").len(), 2);
    }

    #[test]
    fn test_storage_error_has_no_details() {
        let err = RestError::from(StorageError::Unavailable {
            backend: "memory".to_string(),
        });
        assert!(err.to_response(false).details.is_none());
    }

    #[test]
    fn test_rest_response_from_error() {
        let err = RestError::denied("group", "delete");
        let response = RestResponse::from_error(&err, true);

        assert!(!response.is_ok());
        assert_eq!(response.status, StatusCategory::Forbidden);
        assert_eq!(response.http_status, StatusCode::FORBIDDEN);
        assert_eq!(response.body["code"], 403);
        assert_eq!(response.body["is_authenticated"], true);
    }
}

// =============================================================================
// Error Conversion Tests
// =============================================================================

mod error_conversion_tests {
    use super::*;

    #[test]
    fn test_serde_json_error_converts_to_invalid_body() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();

        let err: RestError = json_err.into();

        assert!(matches!(
            err,
            RestError::Request(RequestError::InvalidBody { .. })
        ));
    }

    #[test]
    fn test_uuid_error_converts_to_invalid_key() {
        let uuid_err = Uuid::parse_str("not-a-uuid").unwrap_err();

        let err: RestError = uuid_err.into();

        assert!(matches!(err, RestError::Request(RequestError::InvalidKey { .. })));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_yaml_error_converts_to_config_error() {
        let yaml_err = serde_yaml::from_str::<RestConfig>("entities: 3").unwrap_err();

        let err: RestError = yaml_err.into();

        assert!(matches!(
            err,
            RestError::Config(ConfigError::ParseError { .. })
        ));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_anyhow_error_converts_to_internal() {
        let err: RestError = anyhow::anyhow!("auth backend down").into();

        assert!(matches!(err, RestError::Internal(_)));
        assert!(err.to_string().contains("auth backend down"));
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let err = RestError::from(StorageError::Unavailable {
            backend: "memory".to_string(),
        });
        assert!(err.source().is_some());
        assert!(RestError::denied("todo", "get").source().is_none());
    }
}

// =============================================================================
// Error Pattern Matching Tests
// =============================================================================

mod error_matching_tests {
    use super::*;

    #[test]
    fn test_can_match_validation_errors() {
        let err = RestError::from(ValidationError::field("name", "may not be blank"));

        match err {
            RestError::Validation(ValidationError::Field { field, message }) => {
                assert_eq!(field, "name");
                assert_eq!(message, "may not be blank");
            }
            _ => panic!("Expected a field validation error"),
        }
    }

    #[test]
    fn test_can_match_not_found() {
        let key = Uuid::new_v4();
        match RestError::not_found("todo", key) {
            RestError::NotFound { entity_type, key: found } => {
                assert_eq!(entity_type, "todo");
                assert_eq!(found, key.to_string());
            }
            _ => panic!("Expected NotFound"),
        }
    }
}

// =============================================================================
// IntoResponse Tests
// =============================================================================

mod into_response_tests {
    use super::*;

    #[test]
    fn test_rest_error_into_response_status() {
        let response = RestError::not_found("todo", Uuid::nil()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_rest_response_into_response_status() {
        let err = RestError::from(StorageError::LockPoisoned {
            backend: "memory".to_string(),
        });
        let response = RestResponse::from_error(&err, false).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let ok = RestResponse::ok(serde_json::json!({"status": true})).into_response();
        assert_eq!(ok.status(), StatusCode::OK);
    }
}
