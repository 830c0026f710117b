//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the backend and the client half of the sync engine. These types are used
//! for serialization over the WebSocket, the publish queue and the revert
//! endpoint.
//!
//! # Overview
//!
//! The shared module provides platform-agnostic types that can be used
//! in both server and client code. In particular both sides resolve event
//! names with the same [`template::format_event_name`].

/// Topic addressing
pub mod topic;

/// Event name templates
pub mod template;

/// Real-time event system
pub mod event;

/// Publish instructions (queue messages)
pub mod publish;

/// Revert token wire types
pub mod revert;

/// WebSocket frames
pub mod protocol;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::SharedError;
pub use event::{
    BoardEvent, BoardSettingsEvent, BotChatEvent, CardEvent, GlobalEvent, RealtimeEvent, TopicEvent,
    UserEvent, WikiEvent,
};
pub use protocol::{ClientFrame, ErrorCode, ServerFrame};
pub use publish::{PublishInstruction, PublishModel};
pub use revert::{MutationResponse, RevertKey, RevertRequest, RevertResponse};
pub use template::{event_params, format_event_name, EventParams};
pub use topic::{Topic, TopicId, TopicKey, GLOBAL_TOPIC_ID};
