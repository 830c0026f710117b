//! Revert token ledger
//!
//! Each token maps to exactly one prior mutation: the path it was issued
//! for, the pre-mutation state, and optionally the targets that should hear
//! about the restored state. A token can be consumed once, only for its own
//! path, and only before it expires. Consumed tokens leave a tombstone until
//! their original expiry so a replay is reported as already used rather than
//! unknown.

use crate::shared::publish::PublishModel;
use crate::shared::revert::{normalize_path, RevertKey};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Why a revert was refused
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RevertError {
    #[error("unknown revert key")]
    UnknownKey,

    #[error("revert key expired")]
    Expired,

    #[error("revert key already used")]
    AlreadyUsed,

    #[error("revert key was issued for '{expected}', not '{actual}'")]
    PathMismatch { expected: String, actual: String },

    #[error("compensating write failed: {0}")]
    Compensation(String),
}

/// A successfully consumed token.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumedRevert {
    pub key: RevertKey,
    pub path: String,
    pub pre_state: Map<String, Value>,
    /// Where to broadcast the restored state
    pub broadcast: Vec<PublishModel>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Entry {
    path: String,
    pre_state: Map<String, Value>,
    broadcast: Vec<PublishModel>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    live: HashMap<RevertKey, Entry>,
    /// Consumed keys and when their tombstone may be dropped
    used: HashMap<RevertKey, DateTime<Utc>>,
}

pub struct RevertLedger {
    ttl: chrono::Duration,
    inner: Mutex<Inner>,
}

impl RevertLedger {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(30)),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue a token for a mutation of `path` whose prior state was `pre_state`.
    pub fn issue(&self, path: &str, pre_state: Map<String, Value>, broadcast: Vec<PublishModel>) -> RevertKey {
        self.issue_at(path, pre_state, broadcast, Utc::now())
    }

    pub fn issue_at(
        &self,
        path: &str,
        pre_state: Map<String, Value>,
        broadcast: Vec<PublishModel>,
        now: DateTime<Utc>,
    ) -> RevertKey {
        let key = RevertKey::generate();
        let entry = Entry {
            path: normalize_path(path),
            pre_state,
            broadcast,
            expires_at: now + self.ttl,
        };
        self.lock().live.insert(key.clone(), entry);
        tracing::debug!("[Revert] Issued key for {}", path);
        key
    }

    /// Consume a token for `path`.
    pub fn consume(&self, path: &str, key: &RevertKey) -> Result<ConsumedRevert, RevertError> {
        self.consume_at(path, key, Utc::now())
    }

    pub fn consume_at(&self, path: &str, key: &RevertKey, now: DateTime<Utc>) -> Result<ConsumedRevert, RevertError> {
        let path = normalize_path(path);
        let mut inner = self.lock();

        if inner.used.contains_key(key) {
            return Err(RevertError::AlreadyUsed);
        }

        let (expires_at, issued_for) = match inner.live.get(key) {
            Some(entry) => (entry.expires_at, entry.path.clone()),
            None => return Err(RevertError::UnknownKey),
        };
        if expires_at <= now {
            inner.live.remove(key);
            return Err(RevertError::Expired);
        }
        if issued_for != path {
            return Err(RevertError::PathMismatch {
                expected: issued_for,
                actual: path,
            });
        }

        let entry = inner.live.remove(key).ok_or(RevertError::UnknownKey)?;
        inner.used.insert(key.clone(), entry.expires_at);
        Ok(ConsumedRevert {
            key: key.clone(),
            path: entry.path,
            pre_state: entry.pre_state,
            broadcast: entry.broadcast,
            expires_at: entry.expires_at,
        })
    }

    /// Put a consumed token back after its compensating write failed.
    pub fn reinstate(&self, consumed: ConsumedRevert) {
        let mut inner = self.lock();
        inner.used.remove(&consumed.key);
        inner.live.insert(
            consumed.key,
            Entry {
                path: consumed.path,
                pre_state: consumed.pre_state,
                broadcast: consumed.broadcast,
                expires_at: consumed.expires_at,
            },
        );
    }

    /// Drop expired tokens and tombstones; returns how many live tokens expired.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut inner = self.lock();
        let before = inner.live.len();
        inner.live.retain(|_, entry| entry.expires_at > now);
        inner.used.retain(|_, expires_at| *expires_at > now);
        let swept = before - inner.live.len();
        if swept > 0 {
            tracing::debug!("[Revert] Swept {} expired key(s)", swept);
        }
        swept
    }

    /// Number of tokens that can still be consumed.
    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }
}
