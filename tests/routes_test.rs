//! HTTP handler behavior: the status-confirmation guard and the
//! fail-soft timeout on the conversation list.

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::Json;
use chat_delivery_service::config::Config;
use chat_delivery_service::engine::DeliveryEngine;
use chat_delivery_service::error::{AppError, AppResult};
use chat_delivery_service::models::{Message, MessageStatus, ParticipantId, SendIntent};
use chat_delivery_service::presence::PresenceTable;
use chat_delivery_service::routes::conversations::{list_conversations, ConversationListParams};
use chat_delivery_service::routes::messages::{update_message_status, StatusUpdateRequest};
use chat_delivery_service::state::AppState;
use chat_delivery_service::store::{InMemoryMessageStore, MessageStore};
use std::sync::Arc;
use std::time::Duration;

fn state_with(store: Arc<dyn MessageStore>, list_fetch_timeout: Duration) -> AppState {
    let mut config = Config::test_defaults();
    config.list_fetch_timeout = list_fetch_timeout;
    AppState {
        engine: DeliveryEngine::new(store, PresenceTable::new()),
        config: Arc::new(config),
    }
}

fn intent(correlation: &str, from: &str, to: &str, body: &str) -> SendIntent {
    SendIntent {
        client_correlation_id: Some(correlation.to_string()),
        sender_id: from.to_string(),
        recipient_id: to.to_string(),
        body: body.to_string(),
    }
}

async fn post_status(state: &AppState, id: &str, status: MessageStatus) -> Result<(), AppError> {
    update_message_status(
        State(state.clone()),
        Path(id.to_string()),
        Json(StatusUpdateRequest { status }),
    )
    .await
    .map(|_| ())
}

#[tokio::test]
async fn status_endpoint_only_accepts_receipt_confirmations() {
    let store = InMemoryMessageStore::new();
    let state = state_with(Arc::new(store.clone()), Duration::from_secs(10));
    state
        .engine
        .submit_message(intent("c1", "alice", "bob", "hi"))
        .await
        .unwrap();

    // `failed` is the engine's verdict, never the client's. Accepting it
    // here would be terminal and block the eventual read receipt.
    for status in [MessageStatus::Failed, MessageStatus::Pending, MessageStatus::Sent] {
        let err = post_status(&state, "c1", status).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidMessage(_)), "{status} must be rejected");
    }

    // The message is untouched, so the real confirmations still land.
    post_status(&state, "c1", MessageStatus::Delivered).await.unwrap();
    post_status(&state, "c1", MessageStatus::Read).await.unwrap();

    let history = store
        .find_by_participant_pair(
            &ParticipantId::normalize("alice"),
            &ParticipantId::normalize("bob"),
        )
        .await
        .unwrap();
    assert_eq!(history[0].status, MessageStatus::Read);
}

/// Store whose projection query never comes back in time.
#[derive(Clone)]
struct StalledStore;

#[async_trait]
impl MessageStore for StalledStore {
    async fn upsert_on_insert(&self, _message: &Message) -> AppResult<bool> {
        Ok(true)
    }

    async fn update_status(
        &self,
        _message_id: &str,
        _status: MessageStatus,
    ) -> AppResult<Option<Message>> {
        Ok(None)
    }

    async fn find_by_participant_pair(
        &self,
        _a: &ParticipantId,
        _b: &ParticipantId,
    ) -> AppResult<Vec<Message>> {
        Ok(Vec::new())
    }

    async fn find_latest_per_counterpart(
        &self,
        _participant: &ParticipantId,
    ) -> AppResult<Vec<Message>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Vec::new())
    }

    async fn list_participants(&self) -> AppResult<Vec<ParticipantId>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn conversation_list_fails_soft_to_empty_on_slow_store() {
    let state = state_with(Arc::new(StalledStore), Duration::from_millis(50));

    let Json(summaries) = list_conversations(
        State(state),
        Query(ConversationListParams {
            participant_id: "alice".to_string(),
        }),
    )
    .await
    .unwrap();

    assert!(summaries.is_empty());
}
