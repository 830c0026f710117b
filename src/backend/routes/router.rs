/**
 * Router Configuration
 *
 * This module provides the main router creation function that combines
 * all route configurations into a single Axum router.
 *
 * # Route Details
 *
 * - `GET /ws` - WebSocket sessions
 * - `GET /health` - Health and counters
 * - `POST /revert/{*path}` - Revert endpoint
 * - `POST /internal/publish` - Raw publish instruction intake (bearer token)
 *
 * Requests are traced with `tower_http::trace::TraceLayer`.
 */

use crate::backend::auth::{bearer_token, principal_from_token};
use crate::backend::error::BackendError;
use crate::backend::realtime::socket::ws_handler;
use crate::backend::revert::handle_revert;
use crate::backend::server::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::trace::TraceLayer;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub connections: usize,
    pub subscriptions: usize,
    pub topics: usize,
    pub revert_keys: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: state.registry.connection_count(),
        subscriptions: state.registry.subscription_count(),
        topics: state.registry.topic_count(),
        revert_keys: state.revert_ledger.live_count(),
    })
}

/// Accept a publish instruction from another process.
///
/// The caller must present a bearer token signed with the server secret.
/// The body is validated by the consumer, not here, so a malformed
/// instruction is still accepted and then dropped with a warning.
async fn publish_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(message): Json<Value>,
) -> Result<StatusCode, BackendError> {
    let token = bearer_token(&headers).ok_or_else(|| BackendError::unauthorized("missing token"))?;
    let principal = principal_from_token(&token, &state.config.jwt_secret).map_err(|e| {
        tracing::debug!("[Router] Rejected publish token: {}", e);
        BackendError::unauthorized("invalid token")
    })?;
    tracing::debug!("[Router] Publish instruction from {}", principal.user_id);

    state.queue.enqueue_raw(message).await?;
    Ok(StatusCode::ACCEPTED)
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/revert/{*path}", post(handle_revert))
        .route("/internal/publish", post(publish_handler))
        .fallback(|| async { (StatusCode::NOT_FOUND, "404 Not Found") })
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
