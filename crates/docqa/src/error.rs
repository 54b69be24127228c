//! Error types for the Q&A service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for docqa operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Uploaded document has an extension we cannot load
    #[error("Unsupported file type: {0}. Use PDF or JSON.")]
    UnsupportedFileType(String),

    /// Upload exceeds the configured size limit
    #[error("File too large. Limit is {limit_mb}MB")]
    FileTooLarge { limit_mb: usize },

    /// Questions file is malformed or violates the batch limits
    #[error("{0}")]
    InvalidQuestions(String),

    /// Malformed request (missing multipart field, wrong questions file type)
    #[error("{0}")]
    BadRequest(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Document loaded but produced no text to index
    #[error("Document contains no extractable text.")]
    EmptyDocument,

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// LLM error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Non-success status returned by an upstream API
    #[error("Upstream API returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Operation exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether retrying the failed upstream call may succeed.
    ///
    /// Connection failures, timeouts, rate limiting (429) and server errors (5xx)
    /// are transient. Everything else fails immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err
                        .status()
                        .map(|s| s.as_u16() == 429 || s.is_server_error())
                        .unwrap_or(false)
            }
            Error::Upstream { status, .. } => *status == 429 || (500..600).contains(status),
            Error::Timeout(_) => true,
            _ => false,
        }
    }

    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            Error::UnsupportedFileType(_) => (StatusCode::BAD_REQUEST, "unsupported_type"),
            Error::FileTooLarge { .. } => (StatusCode::BAD_REQUEST, "file_too_large"),
            Error::InvalidQuestions(_) => (StatusCode::BAD_REQUEST, "invalid_questions"),
            Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Error::FileParse { .. } => (StatusCode::BAD_REQUEST, "parse_error"),
            Error::EmptyDocument => (StatusCode::BAD_REQUEST, "empty_document"),
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::Embedding(_) => (StatusCode::INTERNAL_SERVER_ERROR, "embedding_error"),
            Error::Llm(_) => (StatusCode::SERVICE_UNAVAILABLE, "llm_error"),
            Error::Upstream { .. } => (StatusCode::BAD_GATEWAY, "upstream_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::INTERNAL_SERVER_ERROR, "json_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    /// Message shown to API clients
    fn detail(&self) -> String {
        match self {
            // Parser internals stay in the logs
            Error::FileParse { message, .. } => message.clone(),
            Error::Http(_) | Error::Io(_) | Error::Json(_) | Error::Internal(_) => {
                "Internal server error.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_kind();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::info!(error = %self, "request rejected");
        }

        let body = Json(json!({
            "detail": self.detail(),
            "type": error_type,
        }));

        (status, body).into_response()
    }
}
