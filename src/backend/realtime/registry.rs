//! Topic registry
//!
//! Tracks which connections are joined to which `(Topic, TopicId)` pairs.
//!
//! Uses lock-free DashMap sharding with two indexes kept in step:
//! - topic key → member connection ids (for fan-out)
//! - connection id → joined topic keys (for release on disconnect)
//!
//! Lock order is `joined` before `sessions` and `members`. A join holds the
//! connection's `joined` entry while it re-checks the session and records the
//! membership, so it cannot interleave with the release in [`TopicRegistry::disconnect`].
//! Nothing acquires `joined` while holding a guard on another map.

use crate::backend::realtime::session::{ConnectionId, ConnectionSession};
use crate::shared::topic::{topic_key, Topic, TopicId, TopicKey};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Registry of live sessions and their topic memberships.
#[derive(Default)]
pub struct TopicRegistry {
    sessions: DashMap<ConnectionId, Arc<ConnectionSession>>,
    members: DashMap<TopicKey, HashSet<ConnectionId>>,
    joined: DashMap<ConnectionId, HashSet<TopicKey>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session.
    pub fn register(&self, session: Arc<ConnectionSession>) -> ConnectionId {
        let id = session.id;
        self.sessions.insert(id, session);
        tracing::info!("[Realtime] Connection {} registered", id);
        id
    }

    pub fn session(&self, connection: &ConnectionId) -> Option<Arc<ConnectionSession>> {
        self.sessions.get(connection).map(|s| s.value().clone())
    }

    /// Join a topic. Returns true when the subscription is new.
    ///
    /// Joining an unregistered connection is refused.
    pub fn join(&self, connection: &ConnectionId, topic: Topic, topic_id: &TopicId) -> bool {
        let key = topic_key(topic, topic_id);
        let mut keys = self.joined.entry(*connection).or_default();
        if !self.sessions.contains_key(connection) {
            drop(keys);
            self.joined.remove_if(connection, |_, keys| keys.is_empty());
            tracing::warn!("[Realtime] Join from unknown connection {} refused", connection);
            return false;
        }

        let added = keys.insert(key.clone());
        if added {
            self.members.entry(key.clone()).or_default().insert(*connection);
            tracing::debug!("[Realtime] {} joined {}/{}", connection, key.0, key.1);
        }
        added
    }

    /// Leave a topic. Returns true when a subscription was removed.
    pub fn leave(&self, connection: &ConnectionId, topic: Topic, topic_id: &TopicId) -> bool {
        let key = topic_key(topic, topic_id);
        let removed = self
            .joined
            .get_mut(connection)
            .map(|mut keys| keys.remove(&key))
            .unwrap_or(false);
        self.joined.remove_if(connection, |_, keys| keys.is_empty());

        if removed {
            self.drop_member(&key, connection);
            tracing::debug!("[Realtime] {} left {}/{}", connection, key.0, key.1);
        }
        removed
    }

    /// Live sessions joined to `(topic, topic_id)`, in no particular order.
    pub fn connections_for(&self, topic: Topic, topic_id: &TopicId) -> Vec<Arc<ConnectionSession>> {
        let key = topic_key(topic, topic_id);
        let ids: Vec<ConnectionId> = match self.members.get(&key) {
            Some(members) => members.iter().copied().collect(),
            None => return Vec::new(),
        };
        ids.iter().filter_map(|id| self.session(id)).collect()
    }

    /// Release every subscription held by `connection`; returns how many.
    ///
    /// Unknown connections are a no-op.
    pub fn release_all(&self, connection: &ConnectionId) -> usize {
        let keys = match self.joined.remove(connection) {
            Some((_, keys)) => keys,
            None => return 0,
        };
        for key in &keys {
            self.drop_member(key, connection);
        }
        keys.len()
    }

    /// Forget a session and release all of its subscriptions.
    pub fn disconnect(&self, connection: &ConnectionId) -> usize {
        self.sessions.remove(connection);
        let released = self.release_all(connection);
        tracing::info!(
            "[Realtime] Connection {} disconnected, released {} subscriptions",
            connection,
            released
        );
        released
    }

    fn drop_member(&self, key: &TopicKey, connection: &ConnectionId) {
        if let Some(mut members) = self.members.get_mut(key) {
            members.remove(connection);
        }
        self.members.remove_if(key, |_, members| members.is_empty());
    }

    /// Topic keys a connection is joined to.
    pub fn subscriptions_of(&self, connection: &ConnectionId) -> Vec<TopicKey> {
        self.joined
            .get(connection)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn connection_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.joined.iter().map(|entry| entry.value().len()).sum()
    }

    /// Number of topic keys with at least one member.
    pub fn topic_count(&self) -> usize {
        self.members.len()
    }
}
