use crate::error::AppResult;
use crate::models::{MessageStatus, ParticipantId};
use crate::store::MessageStore;
use serde::Serialize;

/// One row of the conversation list: the counterpart plus a denormalized
/// summary of the most recent message exchanged with them.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub counterpart_id: ParticipantId,
    pub last_message_body: String,
    pub last_message_timestamp: i64,
    pub last_message_status: MessageStatus,
}

/// Derive the conversation list for `participant`: one entry per distinct
/// counterpart, ordered by recency descending. Pure read, recomputed on
/// every call.
pub async fn list_conversations(
    store: &dyn MessageStore,
    participant: &ParticipantId,
) -> AppResult<Vec<ConversationSummary>> {
    let latest = store.find_latest_per_counterpart(participant).await?;
    let mut out: Vec<ConversationSummary> = latest
        .into_iter()
        .filter_map(|msg| {
            let counterpart = msg.counterpart_of(participant)?.clone();
            Some(ConversationSummary {
                counterpart_id: counterpart,
                last_message_body: msg.body,
                last_message_timestamp: msg.sent_at_ms,
                last_message_status: msg.status,
            })
        })
        .collect();
    // Stable sort: equal timestamps keep the store's order.
    out.sort_by(|a, b| b.last_message_timestamp.cmp(&a.last_message_timestamp));
    Ok(out)
}
