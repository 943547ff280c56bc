use crate::error::AppResult;
use crate::models::{Message, MessageStatus, ParticipantId};
use crate::store::MessageStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local store used in development and tests.
///
/// The single write lock makes the check-then-insert in `upsert_on_insert`
/// atomic, which is the dedup guarantee the engine relies on.
#[derive(Default, Clone)]
pub struct InMemoryMessageStore {
    inner: Arc<RwLock<HashMap<String, Message>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages; test helper.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn upsert_on_insert(&self, message: &Message) -> AppResult<bool> {
        let mut guard = self.inner.write().await;
        if guard.contains_key(&message.message_id) {
            return Ok(false);
        }
        guard.insert(message.message_id.clone(), message.clone());
        Ok(true)
    }

    async fn update_status(
        &self,
        message_id: &str,
        status: MessageStatus,
    ) -> AppResult<Option<Message>> {
        let mut guard = self.inner.write().await;
        match guard.get_mut(message_id) {
            Some(msg) if msg.status.allows_transition_to(status) => {
                msg.status = status;
                Ok(Some(msg.clone()))
            }
            // Unknown id or backward transition: replay or race, drop it.
            _ => Ok(None),
        }
    }

    async fn find_by_participant_pair(
        &self,
        a: &ParticipantId,
        b: &ParticipantId,
    ) -> AppResult<Vec<Message>> {
        let guard = self.inner.read().await;
        let mut out: Vec<Message> = guard
            .values()
            .filter(|m| {
                (&m.sender_id == a && &m.recipient_id == b)
                    || (&m.sender_id == b && &m.recipient_id == a)
            })
            .cloned()
            .collect();
        out.sort_by_key(|m| m.sent_at_ms);
        Ok(out)
    }

    async fn find_latest_per_counterpart(
        &self,
        participant: &ParticipantId,
    ) -> AppResult<Vec<Message>> {
        let guard = self.inner.read().await;
        let mut latest: HashMap<ParticipantId, Message> = HashMap::new();
        for msg in guard.values() {
            let Some(counterpart) = msg.counterpart_of(participant) else {
                continue;
            };
            match latest.get(counterpart) {
                Some(existing) if existing.sent_at_ms >= msg.sent_at_ms => {}
                _ => {
                    latest.insert(counterpart.clone(), msg.clone());
                }
            }
        }
        Ok(latest.into_values().collect())
    }

    async fn list_participants(&self) -> AppResult<Vec<ParticipantId>> {
        let guard = self.inner.read().await;
        let mut seen: Vec<ParticipantId> = Vec::new();
        for msg in guard.values() {
            for id in [&msg.sender_id, &msg.recipient_id] {
                if !seen.contains(id) {
                    seen.push(id.clone());
                }
            }
        }
        seen.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(seen)
    }
}
