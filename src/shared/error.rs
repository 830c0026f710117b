//! Shared Error Types
//!
//! This module defines error types that are shared between the backend and
//! the client half of the sync engine. These errors represent failures that
//! can occur on either side of the wire.
//!
//! # Error Categories
//!
//! - `SerializationError` - JSON serialization/deserialization failures
//! - `ValidationError` - Data validation failures
//! - `UnknownTopic` - A topic name that is not part of the closed topic set
//! - `UnknownField` - A field name an entity does not declare
//!
//! # Usage
//!
//! ```rust
//! use boardsync::shared::error::SharedError;
//!
//! let error = SharedError::validation("uid", "uid must be a string");
//! ```
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync` and can be safely shared across thread boundaries.
use thiserror::Error;

/// Shared error types that can occur in both backend and client
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
    },

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// Topic name outside the closed topic set
    #[error("Unknown topic: {name}")]
    UnknownTopic {
        /// The rejected topic name
        name: String,
    },

    /// Field name an entity does not declare
    #[error("Unknown field '{field}' on {entity}")]
    UnknownField {
        /// Entity kind
        entity: String,
        /// The rejected field name
        field: String,
    },
}

impl SharedError {
    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new unknown topic error
    pub fn unknown_topic(name: impl Into<String>) -> Self {
        Self::UnknownTopic { name: name.into() }
    }

    /// Create a new unknown field error
    pub fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }
}

/// Helper trait for converting serialization errors
impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
