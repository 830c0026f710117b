//! Topic join authorization
//!
//! Every `join` frame is checked here before the registry accepts it. The
//! real access rules (board membership, wiki visibility) live with the
//! application; this crate ships two simple policies.

use crate::backend::realtime::session::Principal;
use crate::shared::topic::{Topic, TopicId};
use async_trait::async_trait;

#[async_trait]
pub trait JoinAuthorizer: Send + Sync {
    /// Whether `principal` may join `(topic, topic_id)`.
    async fn authorize(&self, principal: &Principal, topic: Topic, topic_id: &TopicId) -> bool;
}

/// Accepts every join.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

#[async_trait]
impl JoinAuthorizer for AllowAll {
    async fn authorize(&self, _principal: &Principal, _topic: Topic, _topic_id: &TopicId) -> bool {
        true
    }
}

/// Restricts user channels to their owner; everything else is allowed.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserChannelAuthorizer;

#[async_trait]
impl JoinAuthorizer for UserChannelAuthorizer {
    async fn authorize(&self, principal: &Principal, topic: Topic, topic_id: &TopicId) -> bool {
        match topic {
            Topic::User => topic_id.as_str() == principal.user_id,
            _ => true,
        }
    }
}
