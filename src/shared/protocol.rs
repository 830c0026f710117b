//! WebSocket frames
//!
//! Every frame is a JSON object tagged by `type`.

use crate::shared::event::RealtimeEvent;
use crate::shared::topic::{Topic, TopicId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames sent by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Join { topic: Topic, topic_id: TopicId },
    Leave { topic: Topic, topic_id: TopicId },
    /// Client-originated named event (typing indicators, bot prompts, ...)
    Event {
        event: String,
        #[serde(default)]
        data: Value,
    },
    Ping,
}

/// Frames sent by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Event(RealtimeEvent),
    Joined { topic: Topic, topic_id: TopicId },
    Left { topic: Topic, topic_id: TopicId },
    Error { code: ErrorCode, message: String },
    Pong,
}

/// Machine-readable reason attached to an error frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadFrame,
    Forbidden,
    Internal,
}

impl ServerFrame {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerFrame::Error {
            code,
            message: message.into(),
        }
    }
}
