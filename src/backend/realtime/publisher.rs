//! Topic publisher
//!
//! Delivers one resolved event to one `(Topic, TopicId)` target: a single
//! dispatch-engine emit for server-side handlers, then a non-blocking push to
//! every member connection. Sessions whose socket task has exited are
//! released from the registry on the way.

use crate::backend::realtime::dispatch::{DispatchContext, DispatchReport, EventDispatcher};
use crate::backend::realtime::registry::TopicRegistry;
use crate::backend::realtime::session::ConnectionSession;
use crate::shared::event::{RealtimeEvent, TopicEvent};
use crate::shared::topic::{Topic, TopicId};
use serde_json::Value;
use std::sync::Arc;

/// What happened to one publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Server-side handlers scheduled (or run, for the waiting variant)
    pub handlers: usize,
    /// Connections the event was queued for
    pub delivered: usize,
    /// Connections that could not take the event
    pub dropped: usize,
}

#[derive(Clone)]
pub struct Publisher {
    registry: Arc<TopicRegistry>,
    dispatcher: Arc<EventDispatcher>,
}

impl Publisher {
    pub fn new(registry: Arc<TopicRegistry>, dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    /// Publish a resolved event to one target.
    pub fn publish(&self, topic: Topic, topic_id: &TopicId, event: &str, payload: Value) -> PublishReport {
        let topic_id = TopicId::for_topic(topic, topic_id.as_str());
        let handlers = self
            .dispatcher
            .emit(DispatchContext::new(topic, topic_id.clone(), event, payload.clone()));
        let (delivered, dropped) = self.deliver(RealtimeEvent::new(topic, topic_id, event, payload));
        PublishReport {
            handlers,
            delivered,
            dropped,
        }
    }

    /// Like [`publish`](Self::publish) but waits for server-side handlers.
    pub async fn publish_and_wait(
        &self,
        topic: Topic,
        topic_id: &TopicId,
        event: &str,
        payload: Value,
    ) -> (PublishReport, DispatchReport) {
        let topic_id = TopicId::for_topic(topic, topic_id.as_str());
        let dispatch = self
            .dispatcher
            .emit_and_wait(DispatchContext::new(topic, topic_id.clone(), event, payload.clone()))
            .await;
        let (delivered, dropped) = self.deliver(RealtimeEvent::new(topic, topic_id, event, payload));
        let report = PublishReport {
            handlers: dispatch.succeeded + dispatch.failed,
            delivered,
            dropped,
        };
        (report, dispatch)
    }

    /// Publish a typed topic event.
    pub fn publish_event<E: TopicEvent>(&self, topic_id: &TopicId, event: &E, payload: Value) -> PublishReport {
        self.publish(E::TOPIC, topic_id, &event.event_name(), payload)
    }

    fn deliver(&self, event: RealtimeEvent) -> (usize, usize) {
        let connections = self.registry.connections_for(event.topic, &event.topic_id);
        if connections.is_empty() {
            tracing::debug!(
                "[Realtime] No subscribers for {}/{}, dropping {}",
                event.topic,
                event.topic_id,
                event.event
            );
            return (0, 0);
        }

        let mut delivered = 0;
        let mut dropped = 0;
        for session in connections {
            if session.push(event.clone()) {
                delivered += 1;
            } else {
                dropped += 1;
                self.release_if_closed(&session);
            }
        }

        tracing::debug!(
            "[Realtime] {} on {}/{} delivered to {} connection(s), {} dropped",
            event.event,
            event.topic,
            event.topic_id,
            delivered,
            dropped
        );
        (delivered, dropped)
    }

    fn release_if_closed(&self, session: &ConnectionSession) {
        if session.is_closed() {
            tracing::info!("[Realtime] Releasing stale connection {}", session.id);
            self.registry.disconnect(&session.id);
        }
    }
}
