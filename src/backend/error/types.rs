/**
 * Backend Error Types
 *
 * This module defines error types specific to the backend server.
 * These errors are used in HTTP handlers and can be converted to HTTP responses.
 *
 * # Error Categories
 *
 * ## Handler Errors
 *
 * Handler errors occur when processing HTTP requests:
 * - Missing bearer token
 * - Invalid request body
 *
 * ## Revert Errors
 *
 * Raised by the revert endpoint when a token is unknown, expired, already
 * used or presented for the wrong path.
 *
 * ## Queue Errors
 *
 * Raised when the publish queue is closed or full.
 */

use crate::backend::realtime::consumer::QueueError;
use crate::backend::revert::RevertError;
use crate::shared::SharedError;
use axum::http::StatusCode;
use thiserror::Error;

/// Backend-specific error types
///
/// Each variant maps to an HTTP status code and can be returned directly
/// from an axum handler.
///
/// # Usage
///
/// ```rust
/// use boardsync::backend::error::BackendError;
/// use axum::http::StatusCode;
///
/// let err = BackendError::handler(StatusCode::BAD_REQUEST, "Invalid request");
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error (e.g., invalid request)
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Missing or invalid bearer token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Revert token rejected
    #[error(transparent)]
    Revert(#[from] RevertError),

    /// Publish queue unavailable
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Shared error (from shared module)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new handler error with a status code
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `HandlerError` - Uses the status code from the error
    /// - `Unauthorized` - 401
    /// - `Revert` - 404 unknown, 410 expired, 409 already used, 400 wrong path, 502 compensation
    /// - `Queue` - 503
    /// - `SharedError` - 400 for validation failures, 500 otherwise
    /// - `SerializationError` - 500
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Revert(err) => match err {
                RevertError::UnknownKey => StatusCode::NOT_FOUND,
                RevertError::Expired => StatusCode::GONE,
                RevertError::AlreadyUsed => StatusCode::CONFLICT,
                RevertError::PathMismatch { .. } => StatusCode::BAD_REQUEST,
                RevertError::Compensation(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Queue(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::SharedError(err) => match err {
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                SharedError::ValidationError { .. }
                | SharedError::UnknownTopic { .. }
                | SharedError::UnknownField { .. } => StatusCode::BAD_REQUEST,
            },
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::Unauthorized(message) => message.clone(),
            Self::Revert(err) => err.to_string(),
            Self::Queue(err) => err.to_string(),
            Self::SharedError(err) => err.to_string(),
            Self::SerializationError(err) => err.to_string(),
        }
    }
}
