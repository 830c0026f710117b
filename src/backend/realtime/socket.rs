/**
 * WebSocket Connection Handler
 *
 * `GET /ws?token=...` upgrades to a WebSocket owned by one authenticated
 * principal. The token may also be sent as `Authorization: Bearer`.
 *
 * # Connection Lifecycle
 *
 * 1. Token is decoded into a `Principal` (401 before upgrade on failure)
 * 2. A `ConnectionSession` is created and registered
 * 3. The session hook attaches inbound handlers
 * 4. A send task serializes `ServerFrame`s onto the socket
 * 5. Client frames are processed in order until the socket closes
 * 6. Every subscription of the connection is released
 */

use crate::backend::auth::{bearer_token, principal_from_token};
use crate::backend::error::BackendError;
use crate::backend::realtime::session::ConnectionSession;
use crate::backend::server::state::AppState;
use crate::shared::protocol::{ClientFrame, ErrorCode, ServerFrame};
use crate::shared::topic::TopicId;
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// WebSocket upgrade handler
///
/// Credentials are checked before the upgrade request itself, so a bad token
/// is always a 401.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, BackendError> {
    let token = params
        .token
        .or_else(|| bearer_token(&headers))
        .ok_or_else(|| BackendError::unauthorized("missing token"))?;

    let principal = principal_from_token(&token, &state.config.jwt_secret).map_err(|e| {
        tracing::debug!("[Socket] Rejected token: {}", e);
        BackendError::unauthorized("invalid token")
    })?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    Ok(ws.on_upgrade(move |socket| async move {
        let buffer = state.config.session_buffer;
        let (session, rx) = ConnectionSession::channel(principal, buffer);
        handle_socket(socket, state, session, rx).await
    }))
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    session: Arc<ConnectionSession>,
    mut rx: tokio::sync::mpsc::Receiver<ServerFrame>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let connection = state.registry.register(session.clone());
    if let Some(init) = &state.session_init {
        init(&session);
    }
    tracing::info!(
        "[Socket] {} connected as {}",
        connection,
        session.principal.user_id
    );

    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("[Socket] Could not serialize frame: {}", e);
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = ws_rx.next().await {
        match message {
            Ok(Message::Text(text)) => handle_text(&state, &session, text.as_str()).await,
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => handle_text(&state, &session, text).await,
                Err(_) => {
                    session.push_frame(ServerFrame::error(ErrorCode::BadFrame, "binary frame is not utf-8"));
                }
            },
            Ok(Message::Close(_)) => break,
            // axum answers pings itself
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("[Socket] Error on {}: {}", connection, e);
                break;
            }
        }
    }

    let released = state.registry.disconnect(&connection);
    send_task.abort();
    tracing::info!(
        "[Socket] {} disconnected, released {} subscription(s)",
        connection,
        released
    );
}

async fn handle_text(state: &AppState, session: &Arc<ConnectionSession>, text: &str) {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => process_frame(state, session, frame).await,
        Err(e) => {
            tracing::debug!("[Socket] Bad frame from {}: {}", session.id, e);
            session.push_frame(ServerFrame::error(ErrorCode::BadFrame, e.to_string()));
        }
    }
}

/// Apply one client frame to `session`.
///
/// Replies (joined, left, pong, errors) are pushed onto the session's own
/// outbound channel.
pub async fn process_frame(state: &AppState, session: &Arc<ConnectionSession>, frame: ClientFrame) {
    match frame {
        ClientFrame::Join { topic, topic_id } => {
            let topic_id = TopicId::for_topic(topic, topic_id.as_str());

            if !state.authorizer.authorize(&session.principal, topic, &topic_id).await {
                tracing::info!(
                    "[Socket] {} denied join to {}:{}",
                    session.principal.user_id,
                    topic,
                    topic_id
                );
                session.push_frame(ServerFrame::error(
                    ErrorCode::Forbidden,
                    format!("not allowed to join {}:{}", topic, topic_id),
                ));
                return;
            }

            if state.registry.join(&session.id, topic, &topic_id) {
                tracing::debug!("[Socket] {} joined {}:{}", session.id, topic, topic_id);
            }
            session.push_frame(ServerFrame::Joined { topic, topic_id });
        }
        ClientFrame::Leave { topic, topic_id } => {
            let topic_id = TopicId::for_topic(topic, topic_id.as_str());
            state.registry.leave(&session.id, topic, &topic_id);
            session.push_frame(ServerFrame::Left { topic, topic_id });
        }
        ClientFrame::Event { event, data } => {
            session.handle_inbound(&event, &data);
        }
        ClientFrame::Ping => {
            session.push_frame(ServerFrame::Pong);
        }
    }
}
