//! Topic addressing
//!
//! Broadcast traffic is partitioned by a [`Topic`] (the entity category) and a
//! [`TopicId`] (the instance). Global topics have no instance and always use
//! the [`GLOBAL_TOPIC_ID`] sentinel.

use crate::shared::error::SharedError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel id used by topics that are not scoped to an instance.
pub const GLOBAL_TOPIC_ID: &str = "all";

/// Entity category a subscription or publish target addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    /// Application-wide announcements
    Global,
    /// One user's private channel (notifications, profile)
    User,
    /// Everything visible on a board (cards, columns, members)
    Board,
    /// Board administration (labels, bot scopes)
    BoardSettings,
    /// A single card's detail view
    BoardCard,
    /// A single wiki page
    BoardWiki,
    /// Conversation between a user and a board bot
    BotChat,
}

impl Topic {
    /// Every topic, in declaration order.
    pub const ALL: [Topic; 7] = [
        Topic::Global,
        Topic::User,
        Topic::Board,
        Topic::BoardSettings,
        Topic::BoardCard,
        Topic::BoardWiki,
        Topic::BotChat,
    ];

    /// Wire name of the topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Global => "global",
            Topic::User => "user",
            Topic::Board => "board",
            Topic::BoardSettings => "board-settings",
            Topic::BoardCard => "board-card",
            Topic::BoardWiki => "board-wiki",
            Topic::BotChat => "bot-chat",
        }
    }

    /// Whether the topic ignores its id and always uses the global sentinel.
    pub fn is_global(&self) -> bool {
        matches!(self, Topic::Global)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .iter()
            .copied()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| SharedError::unknown_topic(s))
    }
}

/// Opaque instance id scoping a topic (a board uid, a user uid, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(String);

impl TopicId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The sentinel id shared by global topics.
    pub fn global() -> Self {
        Self(GLOBAL_TOPIC_ID.to_string())
    }

    /// Id as it should be stored for `topic`: global topics collapse to the sentinel.
    pub fn for_topic(topic: Topic, id: impl Into<String>) -> Self {
        if topic.is_global() {
            Self::global()
        } else {
            Self(id.into())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_global(&self) -> bool {
        self.0 == GLOBAL_TOPIC_ID
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TopicId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TopicId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A (topic, instance) pair; the unit of subscription.
pub type TopicKey = (Topic, TopicId);

/// Build a normalized [`TopicKey`].
pub fn topic_key(topic: Topic, id: &TopicId) -> TopicKey {
    (topic, TopicId::for_topic(topic, id.as_str()))
}
