// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use convo_live_core::{DiscoveryError, ParseError};
use serde::Serialize;
use thiserror::Error;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::ConversationNotFound(id) => {
                tracing::debug!(conversation_id = %id, "Conversation not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details(
                        "Conversation not found",
                        format!("Conversation ID: {}", id),
                    ),
                )
            }
            ApiError::Parse(parse_err) => {
                let (status, error_msg) = match parse_err {
                    ParseError::NotFound { path } => {
                        tracing::warn!(path = %path.display(), "File not found");
                        (StatusCode::NOT_FOUND, "File not found")
                    }
                    ParseError::PermissionDenied { path } => {
                        tracing::error!(path = %path.display(), "Permission denied");
                        (StatusCode::FORBIDDEN, "Permission denied")
                    }
                    ParseError::Io { path, source } => {
                        tracing::error!(path = %path.display(), error = %source, "IO error");
                        (StatusCode::INTERNAL_SERVER_ERROR, "IO error reading file")
                    }
                    ParseError::InvalidUtf8 { path } => {
                        tracing::error!(path = %path.display(), "Invalid UTF-8");
                        (StatusCode::INTERNAL_SERVER_ERROR, "Invalid file encoding")
                    }
                };
                (
                    status,
                    ErrorResponse::with_details(error_msg, parse_err.to_string()),
                )
            }
            ApiError::Discovery(discovery_err) => {
                let error_msg = match discovery_err {
                    DiscoveryError::ProjectsDirNotFound { path } => {
                        tracing::error!(path = %path.display(), "Projects directory not found");
                        "Projects directory not found"
                    }
                    DiscoveryError::PermissionDenied { path } => {
                        tracing::error!(path = %path.display(), "Permission denied accessing projects");
                        "Cannot access projects directory"
                    }
                    DiscoveryError::Io { path, source } => {
                        tracing::error!(path = %path.display(), error = %source, "IO error during discovery");
                        "IO error accessing projects"
                    }
                    DiscoveryError::HomeDirNotFound => {
                        tracing::error!("Home directory not found");
                        "Home directory not found"
                    }
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details(error_msg, discovery_err.to_string()),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
