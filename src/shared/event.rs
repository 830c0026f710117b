/**
 * Real-time Event System
 *
 * This module defines the envelope delivered to clients for every broadcast
 * and the closed set of events each topic can carry. Event names are plain
 * strings only at the wire boundary; inside the crate each topic has its own
 * enum implementing [`TopicEvent`].
 */
use crate::shared::template::{event_params, format_event_name, EventParams};
use crate::shared::topic::{Topic, TopicId};
use serde::{Deserialize, Serialize};

/// Real-time event delivered to every connection subscribed to its topic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RealtimeEvent {
    /// Topic the event was published on
    pub topic: Topic,
    /// Topic instance
    pub topic_id: TopicId,
    /// Resolved wire event name
    pub event: String,
    /// Event payload (already projected to the target's allow-list)
    pub data: serde_json::Value,
    /// Timestamp when the event was published
    pub timestamp: String,
}

impl RealtimeEvent {
    /// Create a new real-time event
    pub fn new(
        topic: Topic,
        topic_id: TopicId,
        event: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            topic,
            topic_id,
            event: event.into(),
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create an event from a typed topic event
    pub fn typed<E: TopicEvent>(topic_id: TopicId, event: &E, data: serde_json::Value) -> Self {
        Self::new(E::TOPIC, topic_id, event.event_name(), data)
    }
}

/// A closed per-topic event enumeration.
///
/// Implementors map each variant to a wire template and the parameters that
/// resolve it. `TEMPLATES` lists every template the topic can emit so that
/// dispatch tables can be checked exhaustively.
pub trait TopicEvent {
    /// Topic every variant is published on
    const TOPIC: Topic;
    /// Every template the enum can produce
    const TEMPLATES: &'static [&'static str];

    /// Wire template of this variant
    fn template(&self) -> &'static str;

    /// Parameters resolving the template
    fn params(&self) -> EventParams {
        EventParams::new()
    }

    /// Resolved wire event name
    fn event_name(&self) -> String {
        format_event_name(self.template(), &self.params())
    }
}

/// Events on [`Topic::Global`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalEvent {
    SettingsUpdated,
    AnnouncementPosted,
}

impl TopicEvent for GlobalEvent {
    const TOPIC: Topic = Topic::Global;
    const TEMPLATES: &'static [&'static str] =
        &["global:settings:updated", "global:announcement:posted"];

    fn template(&self) -> &'static str {
        match self {
            GlobalEvent::SettingsUpdated => Self::TEMPLATES[0],
            GlobalEvent::AnnouncementPosted => Self::TEMPLATES[1],
        }
    }
}

/// Events on [`Topic::User`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    NotificationCreated,
    ProfileUpdated,
}

impl TopicEvent for UserEvent {
    const TOPIC: Topic = Topic::User;
    const TEMPLATES: &'static [&'static str] =
        &["user:notification:created", "user:profile:updated"];

    fn template(&self) -> &'static str {
        match self {
            UserEvent::NotificationCreated => Self::TEMPLATES[0],
            UserEvent::ProfileUpdated => Self::TEMPLATES[1],
        }
    }
}

/// Events on [`Topic::Board`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// A card was created in the given column
    CardCreated { column_uid: String },
    CardOrderChanged { column_uid: String },
    ColumnOrderChanged,
    AssignedUsersUpdated,
}

impl TopicEvent for BoardEvent {
    const TOPIC: Topic = Topic::Board;
    const TEMPLATES: &'static [&'static str] = &[
        "board:card:created:{column_uid}",
        "board:card:order-changed:{column_uid}",
        "board:column:order-changed",
        "board:assigned-users:updated",
    ];

    fn template(&self) -> &'static str {
        match self {
            BoardEvent::CardCreated { .. } => Self::TEMPLATES[0],
            BoardEvent::CardOrderChanged { .. } => Self::TEMPLATES[1],
            BoardEvent::ColumnOrderChanged => Self::TEMPLATES[2],
            BoardEvent::AssignedUsersUpdated => Self::TEMPLATES[3],
        }
    }

    fn params(&self) -> EventParams {
        match self {
            BoardEvent::CardCreated { column_uid } | BoardEvent::CardOrderChanged { column_uid } => {
                event_params([("column_uid", column_uid.as_str())])
            }
            _ => EventParams::new(),
        }
    }
}

/// Events on [`Topic::BoardSettings`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardSettingsEvent {
    LabelCreated,
    LabelDeleted { uid: String },
    BotScopeChanged { bot_uid: String },
}

impl TopicEvent for BoardSettingsEvent {
    const TOPIC: Topic = Topic::BoardSettings;
    const TEMPLATES: &'static [&'static str] = &[
        "board:settings:label:created",
        "board:settings:label:deleted:{uid}",
        "board:settings:bot-scope:changed:{bot_uid}",
    ];

    fn template(&self) -> &'static str {
        match self {
            BoardSettingsEvent::LabelCreated => Self::TEMPLATES[0],
            BoardSettingsEvent::LabelDeleted { .. } => Self::TEMPLATES[1],
            BoardSettingsEvent::BotScopeChanged { .. } => Self::TEMPLATES[2],
        }
    }

    fn params(&self) -> EventParams {
        match self {
            BoardSettingsEvent::LabelCreated => EventParams::new(),
            BoardSettingsEvent::LabelDeleted { uid } => event_params([("uid", uid.as_str())]),
            BoardSettingsEvent::BotScopeChanged { bot_uid } => {
                event_params([("bot_uid", bot_uid.as_str())])
            }
        }
    }
}

/// Events on [`Topic::BoardCard`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardEvent {
    DetailsChanged { uid: String },
    Deleted { uid: String },
    CommentAdded { uid: String },
}

impl TopicEvent for CardEvent {
    const TOPIC: Topic = Topic::BoardCard;
    const TEMPLATES: &'static [&'static str] = &[
        "board:card:details-changed:{uid}",
        "board:card:deleted:{uid}",
        "board:card:comment:added:{uid}",
    ];

    fn template(&self) -> &'static str {
        match self {
            CardEvent::DetailsChanged { .. } => Self::TEMPLATES[0],
            CardEvent::Deleted { .. } => Self::TEMPLATES[1],
            CardEvent::CommentAdded { .. } => Self::TEMPLATES[2],
        }
    }

    fn params(&self) -> EventParams {
        match self {
            CardEvent::DetailsChanged { uid }
            | CardEvent::Deleted { uid }
            | CardEvent::CommentAdded { uid } => event_params([("uid", uid.as_str())]),
        }
    }
}

/// Events on [`Topic::BoardWiki`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WikiEvent {
    DetailsChanged { uid: String },
    Deleted { uid: String },
}

impl TopicEvent for WikiEvent {
    const TOPIC: Topic = Topic::BoardWiki;
    const TEMPLATES: &'static [&'static str] = &[
        "board:wiki:details-changed:{uid}",
        "board:wiki:deleted:{uid}",
    ];

    fn template(&self) -> &'static str {
        match self {
            WikiEvent::DetailsChanged { .. } => Self::TEMPLATES[0],
            WikiEvent::Deleted { .. } => Self::TEMPLATES[1],
        }
    }

    fn params(&self) -> EventParams {
        match self {
            WikiEvent::DetailsChanged { uid } | WikiEvent::Deleted { uid } => {
                event_params([("uid", uid.as_str())])
            }
        }
    }
}

/// Events on [`Topic::BotChat`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotChatEvent {
    /// A message (user or bot) was appended to the session
    MessageCreated { session_uid: String },
    /// The bot finished or aborted the task it was running
    TaskStatusChanged { session_uid: String },
}

impl TopicEvent for BotChatEvent {
    const TOPIC: Topic = Topic::BotChat;
    const TEMPLATES: &'static [&'static str] = &[
        "bot-chat:message:created:{session_uid}",
        "bot-chat:task:status-changed:{session_uid}",
    ];

    fn template(&self) -> &'static str {
        match self {
            BotChatEvent::MessageCreated { .. } => Self::TEMPLATES[0],
            BotChatEvent::TaskStatusChanged { .. } => Self::TEMPLATES[1],
        }
    }

    fn params(&self) -> EventParams {
        match self {
            BotChatEvent::MessageCreated { session_uid }
            | BotChatEvent::TaskStatusChanged { session_uid } => {
                event_params([("session_uid", session_uid.as_str())])
            }
        }
    }
}
