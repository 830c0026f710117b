//! Client error types

use crate::shared::SharedError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// A field targeted by a new mutation is still owned by an earlier one.
    #[error("a mutation of '{field}' is already in flight")]
    MutationInFlight { field: String },

    #[error("no entity with uid '{0}'")]
    UnknownEntity(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error(transparent)]
    Shared(#[from] SharedError),
}

impl ClientError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        ClientError::Rejected {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}
