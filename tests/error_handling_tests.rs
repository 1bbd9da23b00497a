//! Tests for structured error handling

use agricool::error::{AgriError, ErrorCode, ErrorContext, ErrorReporter, ErrorSeverity};
use agricool::log_structured_error;
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[tokio::test]
async fn test_structured_error_creation() {
    let error = AgriError::connection("Broker went away");
    let structured = error.to_structured_error(None);

    assert_eq!(structured.code, ErrorCode::ConnectionLost);
    assert_eq!(structured.code_number, 1003);
    assert_eq!(structured.category, "connection");
    assert!(structured.is_retryable);
    assert_eq!(structured.severity, ErrorSeverity::Warning);
}

#[tokio::test]
async fn test_error_context_with_metadata() {
    let context = ErrorContext::new(ErrorCode::RecordNotFound, "misting", "end_session")
        .with_metadata("session_id", 12345)
        .with_metadata("shed", "north")
        .with_correlation_id("req_abc123");

    assert_eq!(context.component, "misting");
    assert_eq!(context.operation, "end_session");
    assert_eq!(context.correlation_id, Some("req_abc123".to_string()));
    assert_eq!(context.metadata.get("session_id").unwrap(), 12345);
}

#[tokio::test]
async fn test_error_reporting() {
    let error = AgriError::conflict("Misting session 4 is still open");
    let context = ErrorContext::new(ErrorCode::RecordConflict, "misting", "start_session")
        .with_correlation_id("test_123");

    ErrorReporter::log_error(&error, Some(context));

    let api_response = ErrorReporter::format_api_error(&error, true);
    let error_obj = api_response["error"].as_object().unwrap();

    assert_eq!(error_obj["code"].as_u64().unwrap(), 1302);
    assert_eq!(error_obj["category"].as_str().unwrap(), "record");
    assert!(!error_obj["retryable"].as_bool().unwrap());
    assert_eq!(
        error_obj["message"].as_str().unwrap(),
        "Conflict: Misting session 4 is still open"
    );
}

#[tokio::test]
async fn test_structured_error_macro() {
    let error = AgriError::config("Missing configuration file");

    log_structured_error!(error, "config", "load", "test_correlation");
    log_structured_error!(error, "config", "load");
}

#[test]
fn test_error_code_mapping() {
    let test_cases = vec![
        (AgriError::connection("test"), ErrorCode::ConnectionLost),
        (AgriError::authentication("test"), ErrorCode::InvalidCredentials),
        (AgriError::config("test"), ErrorCode::ConfigurationInvalid),
        (AgriError::database("test"), ErrorCode::StorageFailure),
        (AgriError::mqtt("test"), ErrorCode::BrokerUnavailable),
        (AgriError::timeout("test"), ErrorCode::ConnectionTimeout),
        (AgriError::invalid_input("test"), ErrorCode::InvalidInput),
        (AgriError::not_found("test"), ErrorCode::RecordNotFound),
        (AgriError::conflict("test"), ErrorCode::RecordConflict),
        (
            AgriError::service_unavailable("test"),
            ErrorCode::ServiceUnavailable,
        ),
        (AgriError::parsing_error("test"), ErrorCode::ParsingFailed),
        (AgriError::internal("test"), ErrorCode::InternalError),
    ];

    for (error, expected_code) in test_cases {
        assert_eq!(error.to_error_code(), expected_code);
    }
}

#[test]
fn test_error_severity_classification() {
    assert_eq!(AgriError::database("test").severity(), ErrorSeverity::Critical);
    assert_eq!(
        AgriError::service_unavailable("test").severity(),
        ErrorSeverity::Warning
    );
    assert_eq!(AgriError::mqtt("test").severity(), ErrorSeverity::Warning);
}

#[test]
fn test_status_codes() {
    let cases = [
        (AgriError::invalid_input("x"), StatusCode::BAD_REQUEST),
        (AgriError::authentication("x"), StatusCode::UNAUTHORIZED),
        (AgriError::not_found("x"), StatusCode::NOT_FOUND),
        (AgriError::conflict("x"), StatusCode::CONFLICT),
        (AgriError::service_unavailable("x"), StatusCode::SERVICE_UNAVAILABLE),
        (AgriError::timeout("x"), StatusCode::GATEWAY_TIMEOUT),
        (AgriError::database("x"), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (error, status) in cases {
        assert_eq!(error.status_code(), status, "{error}");
    }
}

#[tokio::test]
async fn test_error_response_body() {
    let response = AgriError::not_found("Notification 999 not found").into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], 1301);
    assert_eq!(body["error"]["message"], "Not found: Notification 999 not found");
    assert!(body["error"].get("component").is_none());
}

#[test]
fn test_client_messages_are_not_sanitized() {
    let error = AgriError::invalid_input("Month must be between 1 and 12, got 13");
    assert_eq!(
        error.sanitized_message(),
        "Invalid input: Month must be between 1 and 12, got 13"
    );
}

#[test]
fn test_retryable_errors() {
    assert!(AgriError::timeout("x").is_retryable());
    assert!(AgriError::mqtt("x").is_retryable());
    assert!(!AgriError::invalid_input("x").is_retryable());
    assert!(!AgriError::not_found("x").is_retryable());
}
