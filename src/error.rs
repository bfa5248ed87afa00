//! Error types for link-resolver
//!
//! This module provides error handling for the library, including:
//! - Stage-level errors produced by individual bypass solvers
//! - Terminal per-link pipeline errors
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for link-resolver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for link-resolver
///
/// Per-link failures never surface here; they are carried by [`PipelineError`]
/// and end up in a link's terminal event instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "resolver.timer_endpoint")
        key: Option<String>,
    },

    /// Malformed batch request, rejected before any work starts
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Task not found
    #[error("task not found: {0}")]
    NotFound(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// The resolver is shutting down and accepts no new batches
    #[error("resolver is shutting down")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Stored document could not be decoded
    #[error("corrupt record {id}: {reason}")]
    Corrupt {
        /// The task ID whose stored document is unreadable
        id: String,
        /// Why decoding failed
        reason: String,
    },
}

/// Failure of a single bypass stage
///
/// None of these abort the batch. The pipeline decides whether a stage error
/// ends the current link or falls through to the next applicable stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// Page fetched but the expected element was absent
    #[error("{0}")]
    NotFound(String),

    /// Network failure, timeout or non-success HTTP status
    #[error("{0}")]
    Fetch(String),

    /// External delegate answered with an error payload
    #[error("{0}")]
    Upstream(String),
}

impl StageError {
    /// Classify a reqwest failure as a fetch error, keeping timeouts readable
    pub(crate) fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StageError::Fetch(format!("timeout fetching {}", url))
        } else if e.is_connect() {
            StageError::Fetch(format!("connection failed for {}: {}", url, e))
        } else {
            StageError::Fetch(format!("request to {} failed: {}", url, e))
        }
    }

    /// Short machine-readable kind, used in structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            StageError::NotFound(_) => "not_found",
            StageError::Fetch(_) => "fetch_error",
            StageError::Upstream(_) => "upstream_error",
        }
    }
}

/// Terminal failure of one link's pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A stage that matched the link failed
    #[error("{stage} failed: {source}")]
    Stage {
        /// Human-readable stage name (e.g. "HubDrive")
        stage: &'static str,
        /// Underlying stage failure
        source: StageError,
    },

    /// No stage ever produced a direct link
    #[error("unrecognized link")]
    UnrecognizedLink,

    /// The item carried no link to resolve
    #[error("no link URL provided")]
    MissingLink,

    /// The unit of work panicked
    #[error("critical error: {0}")]
    Panicked(String),
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "invalid_request",
///     "message": "invalid request: no links provided"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "invalid_request")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::InvalidRequest(_) => 400,
            Error::Serialization(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 500 Internal Server Error - Server-side issues
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ShuttingDown => "shutting_down",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            Error::NotFound(id) => Some(serde_json::json!({ "task_id": id })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
