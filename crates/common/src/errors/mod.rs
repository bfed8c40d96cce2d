//! Error types for DocQA services
//!
//! Provides a closed error taxonomy with:
//! - Distinct error kinds for every failure mode of the QA pipeline
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    UnsupportedFormat,
    PayloadTooLarge,

    // Resource errors (4xxx)
    DocumentNotFound,
    InvalidConversation,

    // Document errors (5xxx)
    EmptyDocument,
    DocumentProcessingError,

    // Rate limiting (6xxx)
    RateLimited,

    // Pipeline errors (8xxx)
    EmbeddingFailure,
    QueryFailed,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::UnsupportedFormat => 1003,
            ErrorCode::PayloadTooLarge => 1004,

            // Resources (4xxx)
            ErrorCode::DocumentNotFound => 4001,
            ErrorCode::InvalidConversation => 4002,

            // Documents (5xxx)
            ErrorCode::EmptyDocument => 5001,
            ErrorCode::DocumentProcessingError => 5002,

            // Rate limits (6xxx)
            ErrorCode::RateLimited => 6001,

            // Pipeline (8xxx)
            ErrorCode::EmbeddingFailure => 8001,
            ErrorCode::QueryFailed => 8002,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Unsupported document format: {name}")]
    UnsupportedFormat { name: String },

    #[error("Payload too large: upload exceeds limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    // Taxonomy errors of the QA pipeline
    #[error("Document ID not found: {id}")]
    DocumentNotFound { id: String },

    #[error("Invalid conversation ID: {id}. Please start a new session.")]
    InvalidConversation { id: String },

    #[error("Document content is empty or could not be processed")]
    EmptyDocument,

    #[error("Failed to process document: {message}")]
    DocumentProcessing { message: String },

    #[error("Embedding failure: {message}")]
    EmbeddingFailure { message: String },

    #[error("Query failed: {message}")]
    QueryFailed { message: String },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Wrap any error as a query failure, keeping taxonomy errors intact.
    ///
    /// Known kinds pass through unchanged; everything else becomes
    /// `QueryFailed` with `context` prefixed to the original message.
    pub fn into_query_failure(self, context: &str) -> Self {
        match self {
            err @ (AppError::DocumentNotFound { .. }
            | AppError::InvalidConversation { .. }
            | AppError::QueryFailed { .. }) => err,
            other => AppError::QueryFailed {
                message: format!("{}: {}", context, other),
            },
        }
    }

    /// Wrap any error as an embedding failure, keeping its message
    pub fn into_embedding_failure(self) -> Self {
        match self {
            err @ AppError::EmbeddingFailure { .. } => err,
            other => AppError::EmbeddingFailure {
                message: other.to_string(),
            },
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            AppError::InvalidConversation { .. } => ErrorCode::InvalidConversation,
            AppError::EmptyDocument => ErrorCode::EmptyDocument,
            AppError::DocumentProcessing { .. } => ErrorCode::DocumentProcessingError,
            AppError::EmbeddingFailure { .. } => ErrorCode::EmbeddingFailure,
            AppError::QueryFailed { .. } => ErrorCode::QueryFailed,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::MissingField { .. }
            | AppError::UnsupportedFormat { .. }
            | AppError::EmptyDocument => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::DocumentNotFound { .. } | AppError::InvalidConversation { .. } => {
                StatusCode::NOT_FOUND
            }

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::DocumentProcessing { .. }
            | AppError::EmbeddingFailure { .. }
            | AppError::QueryFailed { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Structured detail attached to the error response, if any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Validation {
                field: Some(field), ..
            } => Some(serde_json::json!({ "field": field })),
            AppError::PayloadTooLarge { limit } => Some(serde_json::json!({ "limit": limit })),
            AppError::DocumentNotFound { id } => Some(serde_json::json!({ "document_id": id })),
            AppError::InvalidConversation { id } => {
                Some(serde_json::json!({ "conversation_id": id }))
            }
            _ => None,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `"error"`; success bodies carry `"success"`
    pub status: String,
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            error: ErrorDetails {
                code: err.code(),
                message: err.to_string(),
                details: err.details(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let body = ErrorResponse::from(&self);

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %body.error.message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %body.error.message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
