use crate::engine::SubmitReceipt;
use crate::models::{Message, MessageStatus, ParticipantId, SendIntent};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

/// GET /api/v1/messages/:a/:b — full history between two participants,
/// both directions, ascending by timestamp. This pull path is also how an
/// offline recipient recovers messages after reconnect.
pub async fn get_message_history(
    State(state): State<AppState>,
    Path((a, b)): Path<(String, String)>,
) -> Result<Json<Vec<Message>>, crate::error::AppError> {
    let a = ParticipantId::normalize(&a);
    let b = ParticipantId::normalize(&b);
    if a.is_empty() || b.is_empty() {
        return Err(crate::error::AppError::InvalidMessage(
            "both participant ids are required".into(),
        ));
    }
    let messages = state.engine.store().find_by_participant_pair(&a, &b).await?;
    Ok(Json(messages))
}

/// POST /api/v1/messages — synchronous send entry point for clients
/// without a live channel. Same engine path as the socket, same
/// idempotency behavior.
pub async fn send_message(
    State(state): State<AppState>,
    Json(intent): Json<SendIntent>,
) -> Result<Json<SubmitReceipt>, crate::error::AppError> {
    let receipt = state.engine.submit_message(intent).await?;
    Ok(Json(receipt))
}

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: MessageStatus,
}

/// POST /api/v1/messages/:id/status — delivery/read confirmation from a
/// client without a live channel. Backward transitions and unknown ids
/// are silently ignored.
pub async fn update_message_status(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<serde_json::Value>, crate::error::AppError> {
    // Clients only confirm receipt; `failed` and the pre-delivery states
    // belong to the engine. Same rule as the socket path.
    if !matches!(
        body.status,
        MessageStatus::Delivered | MessageStatus::Read
    ) {
        return Err(crate::error::AppError::InvalidMessage(
            "only delivered or read confirmations are accepted".into(),
        ));
    }
    state
        .engine
        .update_delivery_status(&message_id, body.status)
        .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
