/**
 * Application State Management
 *
 * This module defines the application state structure and implements
 * the necessary `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * The `AppState` struct is built once per process and holds every piece of
 * the sync engine:
 * - Topic registry and dispatch engine
 * - Publisher and the producer side of the publish queue
 * - Revert ledger and compensating-write seam
 * - Join authorizer and the per-session hook
 *
 * Nothing here is global; components receive what they need through this
 * struct or through `FromRef` extraction.
 */

use crate::backend::auth::{AllowAll, JoinAuthorizer};
use crate::backend::realtime::consumer::{publish_queue, PublishQueueHandle};
use crate::backend::realtime::dispatch::EventDispatcher;
use crate::backend::realtime::publisher::Publisher;
use crate::backend::realtime::registry::TopicRegistry;
use crate::backend::realtime::session::ConnectionSession;
use crate::backend::revert::{Compensator, Passthrough, RevertLedger};
use crate::shared::AppConfig;
use axum::extract::FromRef;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Hook run for every new connection, typically to register inbound handlers.
pub type SessionInit = Arc<dyn Fn(&Arc<ConnectionSession>) + Send + Sync>;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<TopicRegistry>,
    pub dispatcher: Arc<EventDispatcher>,
    pub publisher: Publisher,
    /// Producer side of the publish queue
    pub queue: PublishQueueHandle,
    pub revert_ledger: Arc<RevertLedger>,
    pub authorizer: Arc<dyn JoinAuthorizer>,
    pub compensator: Arc<dyn Compensator>,
    pub session_init: Option<SessionInit>,
}

impl AppState {
    /// Build state for `config` with the default policies.
    ///
    /// Returns the receiving end of the publish queue for the fan-out consumer.
    pub fn new(config: AppConfig) -> (Self, mpsc::Receiver<Value>) {
        let registry = Arc::new(TopicRegistry::new());
        let dispatcher = Arc::new(EventDispatcher::new());
        let publisher = Publisher::new(registry.clone(), dispatcher.clone());
        let (queue, queue_rx) = publish_queue(config.queue_capacity);
        let revert_ledger = Arc::new(RevertLedger::new(config.revert_ttl()));

        let state = Self {
            config: Arc::new(config),
            registry,
            dispatcher,
            publisher,
            queue,
            revert_ledger,
            authorizer: Arc::new(AllowAll),
            compensator: Arc::new(Passthrough),
            session_init: None,
        };
        (state, queue_rx)
    }

    pub fn with_authorizer(mut self, authorizer: impl JoinAuthorizer + 'static) -> Self {
        self.authorizer = Arc::new(authorizer);
        self
    }

    pub fn with_compensator(mut self, compensator: impl Compensator + 'static) -> Self {
        self.compensator = Arc::new(compensator);
        self
    }

    pub fn with_session_init<F>(mut self, init: F) -> Self
    where
        F: Fn(&Arc<ConnectionSession>) + Send + Sync + 'static,
    {
        self.session_init = Some(Arc::new(init));
        self
    }
}

impl FromRef<AppState> for Arc<TopicRegistry> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.registry.clone()
    }
}

impl FromRef<AppState> for PublishQueueHandle {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.queue.clone()
    }
}

impl FromRef<AppState> for Arc<RevertLedger> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.revert_ledger.clone()
    }
}
