//! Unified error types for the dashboard API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment could not be deserialized.
    #[error("configuration error: {0}")]
    Env(#[from] envy::Error),

    /// A value was present but invalid.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// GitHub Actions API errors.
#[derive(Error, Debug)]
pub enum GitHubError {
    /// Transport-level failure.
    #[error("github request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub answered with a non-success status.
    #[error("github returned HTTP {status}")]
    Status {
        /// Upstream status code.
        status: StatusCode,
        /// Upstream body, parsed as JSON when possible.
        body: Value,
    },

    /// GitHub answered 2xx but the payload had the wrong shape.
    #[error("malformed github payload: {0}")]
    Malformed(String),

    /// A URL could not be built from the configured base.
    #[error("invalid github url: {0}")]
    Url(#[from] url::ParseError),
}

/// Cypress Cloud API errors.
#[derive(Error, Debug)]
pub enum CloudError {
    /// Transport-level failure.
    #[error("cloud request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Cloud API answered with a non-success status.
    #[error("cloud API returned HTTP {0}")]
    Status(StatusCode),

    /// A URL could not be built from the configured base.
    #[error("invalid cloud url: {0}")]
    Url(#[from] url::ParseError),
}

/// Failures inside the correlation tiers. Never returned to clients.
#[derive(Error, Debug)]
pub enum CorrelationError {
    /// Log archive download failed.
    #[error("log download failed: {0}")]
    GitHub(#[from] GitHubError),

    /// Log archive could not be opened.
    #[error("unreadable log archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Archive entry could not be read.
    #[error("failed to read log entry: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced to HTTP clients.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Upstream failure; status and body are propagated.
    #[error("upstream returned HTTP {status}")]
    Upstream {
        /// Upstream status code.
        status: StatusCode,
        /// Upstream body.
        body: Value,
    },

    /// Upstream payload had an unexpected shape.
    #[error("malformed upstream payload: {0}")]
    Malformed(String),

    /// Nothing matched the request.
    #[error("{0}")]
    NotFound(String),

    /// Request body or parameters were invalid.
    #[error("{0}")]
    BadRequest(String),

    /// Method outside the route's allowed set.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl From<GitHubError> for ApiError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::Status { status, body } => ApiError::Upstream { status, body },
            GitHubError::Malformed(msg) => ApiError::Malformed(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Upstream { status, .. } => *status,
            ApiError::Malformed(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Upstream { body, .. } => json!({ "error": body }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Parse an upstream body as JSON, falling back to the raw text.
pub fn upstream_body(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

/// Convenient Result type alias for handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
