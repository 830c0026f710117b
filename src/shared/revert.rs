//! Revert token wire types
//!
//! A mutation endpoint answers with a [`MutationResponse`] carrying a
//! single-use [`RevertKey`]. Posting that key to `/revert/{path}` applies the
//! compensating change once and returns the restored state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque, single-use revert token issued by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevertKey(String);

impl RevertKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Fresh random key.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of `POST /revert/{path}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevertRequest {
    pub revert_key: RevertKey,
}

/// Compensating state returned by a successful revert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevertResponse {
    pub data: Map<String, Value>,
}

/// Response of a mutation endpoint that supports undo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationResponse {
    pub revert_key: RevertKey,
    /// Entity version after the write, when the endpoint tracks one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

/// Normalize a mutation path so `/cards/1`, `cards/1/` and `cards/1` compare equal.
pub fn normalize_path(path: &str) -> String {
    path.trim_matches('/').to_string()
}
