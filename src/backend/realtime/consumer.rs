//! Broadcast fan-out consumer
//!
//! Business handlers enqueue [`PublishInstruction`]s (or raw JSON received
//! from another process) on a bounded queue. A single consumer task drains it
//! and publishes every target with its projected payload.
//!
//! Malformed instructions are logged and dropped; they are never retried.
//! Delivery to zero subscribers is the normal steady state.

use crate::backend::realtime::publisher::Publisher;
use crate::shared::publish::{ParsedInstruction, PublishInstruction, PublishModel};
use crate::shared::SharedError;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised when enqueuing
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("publish queue is closed")]
    Closed,

    #[error("publish queue is full")]
    Full,

    #[error(transparent)]
    Shared(#[from] SharedError),
}

/// Create the publish queue.
pub fn publish_queue(capacity: usize) -> (PublishQueueHandle, mpsc::Receiver<Value>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (PublishQueueHandle { tx }, rx)
}

/// Cloneable producer side of the publish queue.
#[derive(Debug, Clone)]
pub struct PublishQueueHandle {
    tx: mpsc::Sender<Value>,
}

impl PublishQueueHandle {
    pub async fn enqueue(&self, instruction: &PublishInstruction) -> Result<(), QueueError> {
        self.enqueue_raw(instruction.to_value()?).await
    }

    /// Enqueue an unvalidated message; validation happens in the consumer.
    pub async fn enqueue_raw(&self, message: Value) -> Result<(), QueueError> {
        self.tx.send(message).await.map_err(|_| QueueError::Closed)
    }

    /// Enqueue without waiting for capacity.
    pub fn try_enqueue(&self, message: Value) -> Result<(), QueueError> {
        self.tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }
}

/// Outcome of one instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Targets that were published
    pub targets: usize,
    /// Targets skipped as malformed
    pub skipped: usize,
    /// Server-side handlers scheduled across all targets
    pub handlers: usize,
    /// Connection deliveries across all targets
    pub delivered: usize,
    /// The whole instruction was rejected
    pub malformed: bool,
}

pub struct FanoutConsumer {
    publisher: Publisher,
}

impl FanoutConsumer {
    pub fn new(publisher: Publisher) -> Self {
        Self { publisher }
    }

    /// Process one raw queue message.
    pub fn handle_raw(&self, message: &Value) -> FanoutReport {
        match PublishInstruction::parse_lenient(message) {
            Ok(parsed) => self.fan_out(&parsed.data, &parsed.targets, parsed.skipped),
            Err(e) => {
                tracing::warn!("[Fanout] Dropping malformed publish instruction: {}", e);
                FanoutReport {
                    malformed: true,
                    ..FanoutReport::default()
                }
            }
        }
    }

    /// Process one typed instruction.
    pub fn handle(&self, instruction: &PublishInstruction) -> FanoutReport {
        self.fan_out(&instruction.data, instruction.targets(), 0)
    }

    fn fan_out(&self, data: &Map<String, Value>, targets: &[PublishModel], skipped: usize) -> FanoutReport {
        let mut report = FanoutReport {
            skipped,
            ..FanoutReport::default()
        };

        for target in targets {
            let event = target.resolve_event(data);
            let payload = Value::Object(target.outbound_payload(data));
            let published = self.publisher.publish(target.topic, &target.topic_id, &event, payload);
            report.targets += 1;
            report.handlers += published.handlers;
            report.delivered += published.delivered;
        }

        report
    }

    async fn handle_raw_and_wait(&self, message: &Value) -> FanoutReport {
        let ParsedInstruction { data, targets, skipped } = match PublishInstruction::parse_lenient(message) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("[Fanout] Dropping malformed publish instruction: {}", e);
                return FanoutReport {
                    malformed: true,
                    ..FanoutReport::default()
                };
            }
        };

        let mut report = FanoutReport {
            skipped,
            ..FanoutReport::default()
        };
        for target in &targets {
            let event = target.resolve_event(&data);
            let payload = Value::Object(target.outbound_payload(&data));
            let (published, _) = self
                .publisher
                .publish_and_wait(target.topic, &target.topic_id, &event, payload)
                .await;
            report.targets += 1;
            report.handlers += published.handlers;
            report.delivered += published.delivered;
        }
        report
    }

    /// Drain the queue until shutdown is signalled or every producer is gone.
    ///
    /// Dropping the shutdown sender counts as a shutdown signal. On shutdown,
    /// messages already queued are processed and their handlers awaited
    /// before returning. Returns the number of messages processed.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<Value>, mut shutdown: mpsc::Receiver<()>) -> usize {
        tracing::info!("[Fanout] Consumer started");
        let mut processed = 0;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    rx.close();
                    while let Some(message) = rx.recv().await {
                        self.handle_raw_and_wait(&message).await;
                        processed += 1;
                    }
                    tracing::info!("[Fanout] Shutdown requested, drained queue");
                    break;
                }

                message = rx.recv() => {
                    match message {
                        Some(message) => {
                            let report = self.handle_raw(&message);
                            tracing::debug!("[Fanout] Processed instruction: {:?}", report);
                            processed += 1;
                        }
                        None => {
                            tracing::info!("[Fanout] All producers dropped");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("[Fanout] Consumer stopped after {} message(s)", processed);
        processed
    }
}
