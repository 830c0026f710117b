/**
 * Server Initialization
 *
 * This module wires the sync engine into an Axum router and starts the
 * background tasks it depends on.
 *
 * # Initialization Process
 *
 * 1. Build `AppState` (registry, dispatcher, publish queue, revert ledger)
 * 2. Spawn the fan-out consumer on the queue's receiving end
 * 3. Spawn the revert key sweeper
 * 4. Create the router
 *
 * # Shutdown
 *
 * `BackgroundTasks::shutdown` signals both tasks and waits for them. The
 * consumer drains whatever is already queued before it exits.
 */

use crate::backend::realtime::consumer::FanoutConsumer;
use crate::backend::routes::router::create_router;
use crate::backend::server::state::AppState;
use crate::shared::AppConfig;
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Handles to the long-running tasks started with the router.
pub struct BackgroundTasks {
    consumer: JoinHandle<usize>,
    consumer_shutdown: mpsc::Sender<()>,
    sweeper: JoinHandle<()>,
    sweeper_shutdown: mpsc::Sender<()>,
}

impl BackgroundTasks {
    /// Stop both tasks. Returns how many queue messages the consumer processed.
    pub async fn shutdown(self) -> usize {
        let _ = self.consumer_shutdown.send(()).await;
        let _ = self.sweeper_shutdown.send(()).await;

        if let Err(e) = self.sweeper.await {
            tracing::warn!("[Server] Revert sweeper ended abnormally: {}", e);
        }
        match self.consumer.await {
            Ok(processed) => processed,
            Err(e) => {
                tracing::warn!("[Server] Fan-out consumer ended abnormally: {}", e);
                0
            }
        }
    }
}

/// Create the application router and start its background tasks.
pub fn create_app(config: AppConfig) -> (Router<()>, BackgroundTasks) {
    let (state, queue_rx) = AppState::new(config);
    create_app_with_state(state, queue_rx)
}

/// Same as [`create_app`] for a caller-assembled state.
pub fn create_app_with_state(state: AppState, queue_rx: mpsc::Receiver<Value>) -> (Router<()>, BackgroundTasks) {
    tracing::info!("[Server] Initializing boardsync");
    let tasks = spawn_background(&state, queue_rx);
    let app = create_router(state);
    tracing::info!("[Server] Router configured");
    (app, tasks)
}

/// Spawn the fan-out consumer and the revert key sweeper.
pub fn spawn_background(state: &AppState, queue_rx: mpsc::Receiver<Value>) -> BackgroundTasks {
    let (consumer_shutdown, consumer_shutdown_rx) = mpsc::channel(1);
    let consumer = Arc::new(FanoutConsumer::new(state.publisher.clone()));
    let consumer = tokio::spawn(consumer.run(queue_rx, consumer_shutdown_rx));

    let (sweeper_shutdown, mut sweeper_shutdown_rx) = mpsc::channel::<()>(1);
    let ledger = state.revert_ledger.clone();
    let period = state.config.revert_sweep_interval();
    let sweeper = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = sweeper_shutdown_rx.recv() => break,
                _ = interval.tick() => {
                    let swept = ledger.sweep_expired();
                    if swept > 0 {
                        tracing::debug!("[Revert] Swept {} expired key(s)", swept);
                    }
                }
            }
        }
    });

    BackgroundTasks {
        consumer,
        consumer_shutdown,
        sweeper,
        sweeper_shutdown,
    }
}
