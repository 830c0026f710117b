/**
 * Connection Session
 *
 * One connected client's transport handle. Outbound frames go through a
 * bounded channel drained by the socket task; `push` never blocks and
 * reports `false` when the client is gone or too slow to keep up.
 *
 * Sessions also carry a small table of inbound handlers for client-originated
 * events (typing indicators, bot prompts, ...). Handlers are registered by the
 * application's session hook and invoked with per-handler isolation.
 */

use crate::backend::realtime::dispatch::{HandlerError, HandlerId, HandlerIds};
use crate::shared::event::RealtimeEvent;
use crate::shared::protocol::ServerFrame;
use crate::shared::template::{format_event_name, EventParams};
use crate::shared::topic::{Topic, TopicId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// Authenticated owner of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub username: Option<String>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: None,
        }
    }
}

/// Handler for a client-originated event.
pub type InboundHandler = Arc<dyn Fn(&ConnectionSession, &Value) -> Result<(), HandlerError> + Send + Sync>;

/// State for a single connected client.
pub struct ConnectionSession {
    pub id: ConnectionId,
    pub principal: Principal,
    pub connected_at: DateTime<Utc>,
    tx: mpsc::Sender<ServerFrame>,
    inbound: DashMap<String, Vec<(HandlerId, InboundHandler)>>,
    ids: HandlerIds,
}

impl ConnectionSession {
    pub fn new(principal: Principal, tx: mpsc::Sender<ServerFrame>) -> Self {
        Self {
            id: Uuid::new_v4(),
            principal,
            connected_at: Utc::now(),
            tx,
            inbound: DashMap::new(),
            ids: HandlerIds::default(),
        }
    }

    /// Session plus the receiving end of its outbound channel.
    pub fn channel(principal: Principal, buffer: usize) -> (Arc<Self>, mpsc::Receiver<ServerFrame>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Arc::new(Self::new(principal, tx)), rx)
    }

    /// Queue an event for delivery. Returns false if it could not be queued.
    pub fn push(&self, event: RealtimeEvent) -> bool {
        self.push_frame(ServerFrame::Event(event))
    }

    /// Resolve `template` against `params` and push the named event.
    pub fn push_named(
        &self,
        topic: Topic,
        topic_id: TopicId,
        template: &str,
        params: &EventParams,
        data: Value,
    ) -> bool {
        let event = format_event_name(template, params);
        self.push(RealtimeEvent::new(topic, topic_id, event, data))
    }

    pub fn push_frame(&self, frame: ServerFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("[Realtime] Outbound buffer full for {}, dropping frame", self.id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the socket task has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Register a handler for a client-originated event.
    pub fn on<F>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&ConnectionSession, &Value) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = self.ids.next();
        self.inbound
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        let removed = match self.inbound.get_mut(event) {
            Some(mut handlers) => {
                let before = handlers.len();
                handlers.retain(|(existing, _)| *existing != id);
                handlers.len() != before
            }
            None => false,
        };
        self.inbound.remove_if(event, |_, handlers| handlers.is_empty());
        removed
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.inbound.get(event).map(|h| h.len()).unwrap_or(0)
    }

    /// Run every inbound handler bound to `event`; returns how many succeeded.
    pub fn handle_inbound(&self, event: &str, data: &Value) -> usize {
        let handlers = match self.inbound.get(event) {
            Some(handlers) => handlers.value().clone(),
            None => {
                tracing::debug!("[Realtime] No inbound handler for '{}' on {}", event, self.id);
                return 0;
            }
        };

        let mut succeeded = 0;
        for (id, handler) in handlers {
            match std::panic::catch_unwind(AssertUnwindSafe(|| handler(self, data))) {
                Ok(Ok(())) => succeeded += 1,
                Ok(Err(e)) => {
                    tracing::warn!("[Realtime] Inbound handler {:?} failed on '{}': {}", id, event, e)
                }
                Err(_) => tracing::error!("[Realtime] Inbound handler {:?} panicked on '{}'", id, event),
            }
        }
        succeeded
    }
}

impl std::fmt::Debug for ConnectionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("id", &self.id)
            .field("principal", &self.principal)
            .field("connected_at", &self.connected_at)
            .finish()
    }
}
