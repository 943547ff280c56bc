use crate::models::ParticipantId;
use crate::projection::{self, ConversationSummary};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct ConversationListParams {
    pub participant_id: String,
}

/// GET /api/v1/conversations?participant_id=..
///
/// Recomputes the projection on every call. Bounded by the configured
/// fetch timeout; on expiry the caller gets an empty list rather than a
/// hang or an error page.
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(params): Query<ConversationListParams>,
) -> Result<Json<Vec<ConversationSummary>>, crate::error::AppError> {
    let participant = ParticipantId::normalize(&params.participant_id);
    if participant.is_empty() {
        return Err(crate::error::AppError::InvalidMessage(
            "participant_id is required".into(),
        ));
    }

    let store = state.engine.store().clone();
    let fetch = projection::list_conversations(store.as_ref(), &participant);
    match tokio::time::timeout(state.config.list_fetch_timeout, fetch).await {
        Ok(result) => Ok(Json(result?)),
        Err(_) => {
            tracing::warn!(participant = %participant, "conversation list fetch timed out");
            Ok(Json(Vec::new()))
        }
    }
}

/// GET /api/v1/participants — distinct ids the store has seen; feeds the
/// test UI's user picker.
pub async fn list_participants(
    State(state): State<AppState>,
) -> Result<Json<Vec<ParticipantId>>, crate::error::AppError> {
    let participants = state.engine.store().list_participants().await?;
    Ok(Json(participants))
}
