use crate::error::{AppError, AppResult};
use crate::models::{Message, MessageStatus, ParticipantId, SendIntent};
use crate::presence::PresenceTable;
use crate::store::MessageStore;
use crate::websocket::message_types::ServerEvent;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Acknowledgment returned to the submitting client.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitReceipt {
    pub message_id: String,
    pub delivered: bool,
    pub duplicate: bool,
}

/// The delivery reconciliation core: dedup, persist, route, fan out.
///
/// Ordering is persist-before-emit: the store write is awaited before any
/// event leaves the engine, so a status update racing in behind a fan-out
/// always finds its row.
#[derive(Clone)]
pub struct DeliveryEngine {
    store: Arc<dyn MessageStore>,
    presence: PresenceTable,
}

impl DeliveryEngine {
    pub fn new(store: Arc<dyn MessageStore>, presence: PresenceTable) -> Self {
        Self { store, presence }
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    pub fn presence(&self) -> &PresenceTable {
        &self.presence
    }

    /// Accept a send-intent: validate, deduplicate, persist, route.
    ///
    /// A client-supplied correlation id becomes the canonical message id,
    /// so a retransmission of the same intent is a natural duplicate at the
    /// store and produces no second fan-out.
    pub async fn submit_message(&self, intent: SendIntent) -> AppResult<SubmitReceipt> {
        let sender = ParticipantId::normalize(&intent.sender_id);
        let recipient = ParticipantId::normalize(&intent.recipient_id);
        if sender.is_empty() || recipient.is_empty() {
            return Err(AppError::InvalidMessage(
                "sender_id and recipient_id are required".into(),
            ));
        }
        if sender == recipient {
            return Err(AppError::InvalidMessage(
                "cannot send a message to yourself".into(),
            ));
        }

        let message_id = intent
            .client_correlation_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let message = Message {
            message_id: message_id.clone(),
            client_correlation_id: intent.client_correlation_id,
            sender_id: sender.clone(),
            recipient_id: recipient.clone(),
            body: intent.body,
            sent_at_ms: chrono::Utc::now().timestamp_millis(),
            status: MessageStatus::Sent,
        };

        let inserted = self.store.upsert_on_insert(&message).await?;
        if !inserted {
            // Retransmission: acknowledge, but never fan out twice.
            tracing::debug!(%message_id, sender = %sender, "duplicate submission suppressed");
            return Ok(SubmitReceipt {
                message_id,
                delivered: true,
                duplicate: true,
            });
        }

        // Recipient offline is a handled state, not an error; the message
        // stays `sent` until a later pull-based history fetch.
        match self.presence.lookup(&recipient) {
            Some(handle) => {
                handle.send(ServerEvent::NewMessage {
                    message: message.clone(),
                });
                tracing::debug!(%message_id, recipient = %recipient, "pushed to recipient");
            }
            None => {
                tracing::debug!(%message_id, recipient = %recipient, "recipient offline");
            }
        }

        if let Some(handle) = self.presence.lookup(&sender) {
            handle.send(ServerEvent::MessageSent {
                message,
                duplicate: false,
            });
        }

        Ok(SubmitReceipt {
            message_id,
            delivered: true,
            duplicate: false,
        })
    }

    /// Apply a delivery/read confirmation and notify the original sender.
    ///
    /// Missing ids and backward transitions are dropped by the store; the
    /// sender being offline only skips the push, the update is durable
    /// either way.
    pub async fn update_delivery_status(
        &self,
        message_id: &str,
        status: MessageStatus,
    ) -> AppResult<()> {
        let Some(updated) = self.store.update_status(message_id, status).await? else {
            tracing::debug!(%message_id, %status, "status update ignored");
            return Ok(());
        };

        if let Some(handle) = self.presence.lookup(&updated.sender_id) {
            handle.send(ServerEvent::MessageStatusUpdated {
                message_id: updated.message_id.clone(),
                status: updated.status,
            });
        }
        Ok(())
    }
}
