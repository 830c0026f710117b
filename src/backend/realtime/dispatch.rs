//! Event Dispatch Engine
//!
//! Binds `(Topic, resolved event name)` pairs to ordered handler lists and
//! runs them with per-handler failure isolation: a handler that returns an
//! error or panics is logged and the next handler still runs with the same
//! context.
//!
//! `emit` only schedules work on the tokio runtime and returns immediately;
//! `emit_and_wait` runs the same handler chain inline and reports outcomes.

use crate::shared::event::TopicEvent;
use crate::shared::template::{format_event_name, EventParams};
use crate::shared::topic::{Topic, TopicId};
use crate::shared::SharedError;
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Identifies one handler registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// Generates process-unique [`HandlerId`]s.
#[derive(Debug, Default)]
pub struct HandlerIds(AtomicU64);

impl HandlerIds {
    pub fn next(&self) -> HandlerId {
        HandlerId(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Everything a handler sees about one emitted event.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub topic: Topic,
    pub topic_id: TopicId,
    /// Resolved wire event name
    pub event: String,
    pub data: Arc<Value>,
}

impl DispatchContext {
    pub fn new(topic: Topic, topic_id: TopicId, event: impl Into<String>, data: Value) -> Self {
        Self {
            topic,
            topic_id,
            event: event.into(),
            data: Arc::new(data),
        }
    }
}

/// Failure reported by a handler
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    Failed(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] SharedError),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Server-side reaction to an emitted event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, ctx: &DispatchContext) -> Result<(), HandlerError>;
}

/// Adapter turning an async closure into an [`EventHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(DispatchContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, ctx: &DispatchContext) -> Result<(), HandlerError> {
        (self.0)(ctx.clone()).await
    }
}

/// Wrap an async closure as a shareable handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn EventHandler>
where
    F: Fn(DispatchContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Outcome of one handler chain run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub succeeded: usize,
    pub failed: usize,
}

type Binding = (Topic, String);
type HandlerList = Vec<(HandlerId, Arc<dyn EventHandler>)>;

/// Topic-scoped event handler table
#[derive(Default)]
pub struct EventDispatcher {
    bindings: DashMap<Binding, HandlerList>,
    ids: HandlerIds,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for an already-resolved event name.
    pub fn on(&self, topic: Topic, event: &str, handler: Arc<dyn EventHandler>) -> HandlerId {
        let id = self.ids.next();
        self.bindings
            .entry((topic, event.to_string()))
            .or_default()
            .push((id, handler));
        tracing::debug!("[Dispatch] Bound handler {:?} to {}/{}", id, topic, event);
        id
    }

    /// Resolve `template` against `params` and bind the handler to the result.
    pub fn on_template(
        &self,
        topic: Topic,
        template: &str,
        params: &EventParams,
        handler: Arc<dyn EventHandler>,
    ) -> HandlerId {
        self.on(topic, &format_event_name(template, params), handler)
    }

    /// Bind a handler to a typed topic event.
    pub fn on_event<E: TopicEvent>(&self, event: &E, handler: Arc<dyn EventHandler>) -> HandlerId {
        self.on(E::TOPIC, &event.event_name(), handler)
    }

    /// Remove exactly one registration. Returns false when it was already gone.
    pub fn off(&self, topic: Topic, event: &str, id: HandlerId) -> bool {
        let key = (topic, event.to_string());
        let removed = match self.bindings.get_mut(&key) {
            Some(mut handlers) => {
                let before = handlers.len();
                handlers.retain(|(existing, _)| *existing != id);
                handlers.len() != before
            }
            None => false,
        };
        self.bindings.remove_if(&key, |_, handlers| handlers.is_empty());
        removed
    }

    pub fn handler_count(&self, topic: Topic, event: &str) -> usize {
        self.bindings
            .get(&(topic, event.to_string()))
            .map(|handlers| handlers.len())
            .unwrap_or(0)
    }

    /// Total registrations across all bindings.
    pub fn total_handlers(&self) -> usize {
        self.bindings.iter().map(|entry| entry.value().len()).sum()
    }

    fn snapshot(&self, topic: Topic, event: &str) -> HandlerList {
        self.bindings
            .get(&(topic, event.to_string()))
            .map(|handlers| handlers.value().clone())
            .unwrap_or_default()
    }

    /// Schedule every handler bound to `(ctx.topic, ctx.event)`.
    ///
    /// Returns how many handlers were scheduled. Handlers run on a spawned
    /// task in registration order; completion is not awaited.
    pub fn emit(&self, ctx: DispatchContext) -> usize {
        let handlers = self.snapshot(ctx.topic, &ctx.event);
        if handlers.is_empty() {
            return 0;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!("[Dispatch] No runtime to run handlers for {}: {}", ctx.event, e);
                return 0;
            }
        };

        let scheduled = handlers.len();
        runtime.spawn(async move {
            run_handlers(handlers, ctx).await;
        });
        scheduled
    }

    /// Run every handler bound to `(ctx.topic, ctx.event)` and wait for them.
    pub async fn emit_and_wait(&self, ctx: DispatchContext) -> DispatchReport {
        let handlers = self.snapshot(ctx.topic, &ctx.event);
        run_handlers(handlers, ctx).await
    }
}

async fn run_handlers(handlers: HandlerList, ctx: DispatchContext) -> DispatchReport {
    let mut report = DispatchReport::default();

    for (id, handler) in handlers {
        match AssertUnwindSafe(handler.handle(&ctx)).catch_unwind().await {
            Ok(Ok(())) => report.succeeded += 1,
            Ok(Err(e)) => {
                tracing::warn!("[Dispatch] Handler {:?} failed on {}: {}", id, ctx.event, e);
                report.failed += 1;
            }
            Err(_) => {
                tracing::error!("[Dispatch] Handler {:?} panicked on {}", id, ctx.event);
                report.failed += 1;
            }
        }
    }

    report
}
