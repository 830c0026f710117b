/**
 * Revert Endpoint
 *
 * `POST /revert/{*path}` with `{ "revert_key": "..." }`.
 *
 * The key is consumed, the compensating write runs, and the restored state is
 * both returned to the caller and queued for broadcast to the targets the
 * mutation registered, so other clients roll back as well.
 */

use crate::backend::error::BackendError;
use crate::backend::revert::RevertError;
use crate::backend::server::state::AppState;
use crate::shared::publish::PublishInstruction;
use crate::shared::revert::{RevertRequest, RevertResponse};
use axum::{
    extract::{Path, State},
    Json,
};

pub async fn handle_revert(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(request): Json<RevertRequest>,
) -> Result<Json<RevertResponse>, BackendError> {
    let consumed = state.revert_ledger.consume(&path, &request.revert_key).map_err(|e| {
        tracing::info!("[Revert] Rejected revert of {}: {}", path, e);
        e
    })?;

    let restored = match state.compensator.compensate(&consumed.path, &consumed.pre_state).await {
        Ok(restored) => restored,
        Err(message) => {
            tracing::warn!("[Revert] Compensating write for {} failed: {}", consumed.path, message);
            state.revert_ledger.reinstate(consumed);
            return Err(RevertError::Compensation(message).into());
        }
    };

    if !consumed.broadcast.is_empty() {
        let instruction = consumed
            .broadcast
            .iter()
            .cloned()
            .fold(PublishInstruction::new(restored.clone()), PublishInstruction::target);
        if let Err(e) = state.queue.enqueue(&instruction).await {
            tracing::warn!("[Revert] Could not queue restore broadcast for {}: {}", consumed.path, e);
        }
    }

    tracing::info!("[Revert] Reverted {}", consumed.path);
    Ok(Json(RevertResponse { data: restored }))
}
