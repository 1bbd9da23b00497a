//! Error types for the AgriCool server
//!
//! This module provides structured error handling with machine-readable error
//! codes, severity classification and production-safe logging integration.
//! HTTP handlers return [`AgriError`] directly; the [`IntoResponse`] impl maps
//! each variant onto a status code and a JSON error body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for AgriCool operations
pub type Result<T> = std::result::Result<T, AgriError>;

/// Error types for AgriCool operations
#[derive(Error, Debug)]
pub enum AgriError {
    /// Connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(String),

    /// MQTT broker errors
    #[error("MQTT error: {0}")]
    Mqtt(String),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not found errors (sessions, notifications, users, etc.)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflicting state (duplicate email, session already open)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Service unavailable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Parsing errors
    #[error("Parsing error: {0}")]
    Parsing(String),
}

/// Structured error code for machine-readable error handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Connection errors (1000-1099)
    ConnectionTimeout,
    ConnectionLost,
    BrokerUnavailable,

    // Authentication errors (1100-1199)
    InvalidCredentials,

    // Configuration errors (1200-1299)
    ConfigurationInvalid,

    // Record errors (1300-1399)
    RecordNotFound,
    RecordConflict,

    // Data errors (1400-1499)
    ParsingFailed,
    InvalidInput,

    // Storage errors (1500-1599)
    StorageFailure,

    // Service errors (1600-1699)
    ServiceUnavailable,

    // Internal errors (1900-1999)
    InternalError,
}

impl ErrorCode {
    /// Get numeric error code
    pub fn as_number(&self) -> u32 {
        match self {
            ErrorCode::ConnectionTimeout => 1001,
            ErrorCode::ConnectionLost => 1003,
            ErrorCode::BrokerUnavailable => 1005,

            ErrorCode::InvalidCredentials => 1101,

            ErrorCode::ConfigurationInvalid => 1202,

            ErrorCode::RecordNotFound => 1301,
            ErrorCode::RecordConflict => 1302,

            ErrorCode::ParsingFailed => 1401,
            ErrorCode::InvalidInput => 1402,

            ErrorCode::StorageFailure => 1501,

            ErrorCode::ServiceUnavailable => 1601,

            ErrorCode::InternalError => 1901,
        }
    }

    /// Get error category
    pub fn category(&self) -> &'static str {
        match self.as_number() {
            1000..=1099 => "connection",
            1100..=1199 => "authentication",
            1200..=1299 => "configuration",
            1300..=1399 => "record",
            1400..=1499 => "data",
            1500..=1599 => "storage",
            1600..=1699 => "service",
            1900..=1999 => "internal",
            _ => "unknown",
        }
    }
}

/// Structured error context with additional metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Error code for machine processing
    pub code: ErrorCode,
    /// Component that generated the error
    pub component: String,
    /// Operation that was being performed
    pub operation: String,
    /// Additional metadata about the error
    pub metadata: HashMap<String, serde_json::Value>,
    /// Timestamp when error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Request ID for correlation
    pub correlation_id: Option<String>,
    /// Stack trace (only in debug builds)
    #[cfg(debug_assertions)]
    pub stack_trace: Option<String>,
}

impl ErrorContext {
    /// Create new error context
    pub fn new(code: ErrorCode, component: &str, operation: &str) -> Self {
        Self {
            code,
            component: component.to_string(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
            timestamp: chrono::Utc::now(),
            correlation_id: None,
            #[cfg(debug_assertions)]
            stack_trace: None,
        }
    }

    /// Add metadata to error context
    pub fn with_metadata<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set correlation ID for request tracking
    pub fn with_correlation_id<S: Into<String>>(mut self, id: S) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Add stack trace in debug builds
    #[cfg(debug_assertions)]
    pub fn with_stack_trace(mut self) -> Self {
        self.stack_trace = Some(format!("{:?}", backtrace::Backtrace::new()));
        self
    }
}

/// Error representation for logging and API responses
#[derive(Debug, Clone, Serialize)]
pub struct StructuredError {
    pub code: ErrorCode,
    pub code_number: u32,
    pub category: &'static str,
    /// Production-safe error message
    pub message: String,
    pub is_retryable: bool,
    pub component: String,
    pub operation: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub severity: ErrorSeverity,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub correlation_id: Option<String>,
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Low severity - information only
    Info,
    /// Medium severity - warning condition
    Warning,
    /// High severity - error condition
    Error,
    /// Critical severity - immediate attention required
    Critical,
}

impl AgriError {
    /// Create a connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an authentication error
    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a database error
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create an MQTT error
    pub fn mqtt<S: Into<String>>(msg: S) -> Self {
        Self::Mqtt(msg.into())
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a conflict error
    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a service unavailable error
    pub fn service_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    /// Create a parsing error
    pub fn parsing_error<S: Into<String>>(msg: S) -> Self {
        Self::Parsing(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Generic(anyhow::anyhow!(msg.into()))
    }

    /// Map AgriError to structured error code
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            AgriError::Connection(_) => ErrorCode::ConnectionLost,
            AgriError::Authentication(_) => ErrorCode::InvalidCredentials,
            AgriError::Config(_) => ErrorCode::ConfigurationInvalid,
            AgriError::Database(_) => ErrorCode::StorageFailure,
            AgriError::Mqtt(_) => ErrorCode::BrokerUnavailable,
            AgriError::Timeout(_) => ErrorCode::ConnectionTimeout,
            AgriError::InvalidInput(_) => ErrorCode::InvalidInput,
            AgriError::NotFound(_) => ErrorCode::RecordNotFound,
            AgriError::Conflict(_) => ErrorCode::RecordConflict,
            AgriError::ServiceUnavailable(_) => ErrorCode::ServiceUnavailable,
            AgriError::Parsing(_) | AgriError::Json(_) => ErrorCode::ParsingFailed,
            AgriError::Io(_) | AgriError::Generic(_) => ErrorCode::InternalError,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AgriError::Database(_) | AgriError::Config(_) => ErrorSeverity::Critical,
            AgriError::Connection(_)
            | AgriError::ServiceUnavailable(_)
            | AgriError::Mqtt(_)
            | AgriError::Timeout(_) => ErrorSeverity::Warning,
            AgriError::InvalidInput(_)
            | AgriError::Parsing(_)
            | AgriError::Json(_)
            | AgriError::NotFound(_)
            | AgriError::Conflict(_)
            | AgriError::Authentication(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgriError::Connection(_)
                | AgriError::Timeout(_)
                | AgriError::ServiceUnavailable(_)
                | AgriError::Mqtt(_)
        )
    }

    /// HTTP status code for API responses
    pub fn status_code(&self) -> StatusCode {
        match self {
            AgriError::InvalidInput(_) | AgriError::Parsing(_) | AgriError::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            AgriError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AgriError::NotFound(_) => StatusCode::NOT_FOUND,
            AgriError::Conflict(_) => StatusCode::CONFLICT,
            AgriError::ServiceUnavailable(_) | AgriError::Mqtt(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AgriError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create a structured error from this AgriError
    pub fn to_structured_error(&self, context: Option<ErrorContext>) -> StructuredError {
        let error_code = self.to_error_code();
        let base_context =
            context.unwrap_or_else(|| ErrorContext::new(error_code.clone(), "unknown", "unknown"));

        StructuredError {
            code: error_code.clone(),
            code_number: error_code.as_number(),
            category: error_code.category(),
            message: self.sanitized_message(),
            is_retryable: self.is_retryable(),
            component: base_context.component,
            operation: base_context.operation,
            metadata: base_context.metadata,
            severity: self.severity(),
            timestamp: base_context.timestamp,
            correlation_id: base_context.correlation_id,
        }
    }

    /// Get a production-safe error message that doesn't expose internals
    pub fn sanitized_message(&self) -> String {
        match self {
            // Client-facing errors carry messages meant for the dashboard
            AgriError::InvalidInput(_)
            | AgriError::NotFound(_)
            | AgriError::Conflict(_)
            | AgriError::Authentication(_)
            | AgriError::ServiceUnavailable(_) => self.to_string(),
            #[cfg(debug_assertions)]
            _ => self.to_string(),
            #[cfg(not(debug_assertions))]
            AgriError::Database(_) => "Storage operation failed".to_string(),
            #[cfg(not(debug_assertions))]
            AgriError::Config(_) => "Configuration error".to_string(),
            #[cfg(not(debug_assertions))]
            AgriError::Mqtt(_) | AgriError::Connection(_) => {
                "Broker connection issue".to_string()
            }
            #[cfg(not(debug_assertions))]
            AgriError::Timeout(_) => "Operation timed out".to_string(),
            #[cfg(not(debug_assertions))]
            AgriError::Parsing(_) | AgriError::Json(_) => "Data parsing error".to_string(),
            #[cfg(not(debug_assertions))]
            #[cfg(not(debug_assertions))]
            AgriError::Io(_) | AgriError::Generic(_) => "Internal error occurred".to_string(),
        }
    }
}

impl From<sqlx::Error> for AgriError {
    fn from(err: sqlx::Error) -> Self {
        AgriError::Database(err.to_string())
    }
}

impl From<regex::Error> for AgriError {
    fn from(err: regex::Error) -> Self {
        AgriError::InvalidInput(format!("Regex error: {err}"))
    }
}

impl IntoResponse for AgriError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            ErrorReporter::log_error(&self, None);
        }
        (status, Json(ErrorReporter::format_api_error(&self, false))).into_response()
    }
}

/// Error logging and reporting utilities
pub struct ErrorReporter;

impl ErrorReporter {
    /// Log a structured error with appropriate severity
    pub fn log_error(error: &AgriError, context: Option<ErrorContext>) {
        let structured = error.to_structured_error(context);

        match structured.severity {
            ErrorSeverity::Critical | ErrorSeverity::Error => {
                tracing::error!(
                    error_code = structured.code_number,
                    category = structured.category,
                    component = structured.component,
                    operation = structured.operation,
                    correlation_id = structured.correlation_id,
                    "Error occurred: {}",
                    structured.message
                );
            }
            ErrorSeverity::Warning => {
                tracing::warn!(
                    error_code = structured.code_number,
                    category = structured.category,
                    component = structured.component,
                    operation = structured.operation,
                    correlation_id = structured.correlation_id,
                    "Warning: {}",
                    structured.message
                );
            }
            ErrorSeverity::Info => {
                tracing::info!(
                    error_code = structured.code_number,
                    category = structured.category,
                    component = structured.component,
                    operation = structured.operation,
                    correlation_id = structured.correlation_id,
                    "Info: {}",
                    structured.message
                );
            }
        }
    }

    /// Create an error context with stack trace (debug builds only)
    pub fn create_context(code: ErrorCode, component: &str, operation: &str) -> ErrorContext {
        #[cfg(debug_assertions)]
        {
            ErrorContext::new(code, component, operation).with_stack_trace()
        }

        #[cfg(not(debug_assertions))]
        {
            ErrorContext::new(code, component, operation)
        }
    }

    /// Format error for API responses
    pub fn format_api_error(error: &AgriError, include_details: bool) -> serde_json::Value {
        let structured = error.to_structured_error(None);

        let mut response = serde_json::json!({
            "error": {
                "code": structured.code_number,
                "category": structured.category,
                "message": structured.message,
                "retryable": structured.is_retryable,
                "timestamp": structured.timestamp
            }
        });

        if include_details {
            response["error"]["component"] = serde_json::Value::String(structured.component);
            response["error"]["operation"] = serde_json::Value::String(structured.operation);

            if let Some(correlation_id) = structured.correlation_id {
                response["error"]["correlation_id"] = serde_json::Value::String(correlation_id);
            }
        }

        response
    }
}

/// Macro for easy structured error logging
#[macro_export]
macro_rules! log_structured_error {
    ($error:expr, $component:expr, $operation:expr) => {
        $crate::error::ErrorReporter::log_error(
            &$error,
            Some($crate::error::ErrorReporter::create_context(
                $error.to_error_code(),
                $component,
                $operation,
            )),
        )
    };
    ($error:expr, $component:expr, $operation:expr, $correlation_id:expr) => {
        $crate::error::ErrorReporter::log_error(
            &$error,
            Some(
                $crate::error::ErrorReporter::create_context(
                    $error.to_error_code(),
                    $component,
                    $operation,
                )
                .with_correlation_id($correlation_id),
            ),
        )
    };
}
