//! Compensating writes
//!
//! Persistence lives outside this crate, so the revert endpoint hands the
//! stored pre-state to a [`Compensator`] which writes it back and returns the
//! state clients should converge on.

use async_trait::async_trait;
use serde_json::{Map, Value};

#[async_trait]
pub trait Compensator: Send + Sync {
    /// Restore `pre_state` for the entity behind `path`.
    ///
    /// Returns the restored state, or a message describing why it failed.
    async fn compensate(&self, path: &str, pre_state: &Map<String, Value>) -> Result<Map<String, Value>, String>;
}

/// Returns the stored pre-state unchanged without writing anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

#[async_trait]
impl Compensator for Passthrough {
    async fn compensate(&self, _path: &str, pre_state: &Map<String, Value>) -> Result<Map<String, Value>, String> {
        Ok(pre_state.clone())
    }
}
