use crate::error::AppResult;
use crate::models::{Message, MessageStatus, ParticipantId};
use async_trait::async_trait;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryMessageStore;
pub use postgres::PgMessageStore;

/// Durable record of every message, keyed by its globally unique id.
///
/// The delivery engine is the single writer. Implementations must make
/// `upsert_on_insert` atomic with respect to concurrent calls for the same
/// `message_id`: two racing retransmissions must not both observe "absent".
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert the record if `message_id` is absent. A duplicate id performs
    /// no content mutation. Returns whether an insert occurred.
    async fn upsert_on_insert(&self, message: &Message) -> AppResult<bool>;

    /// Targeted status update. Missing ids and backward transitions are
    /// silent no-ops (`None`); `Some` carries the updated record.
    async fn update_status(
        &self,
        message_id: &str,
        status: MessageStatus,
    ) -> AppResult<Option<Message>>;

    /// All messages exchanged between `a` and `b`, either direction,
    /// ascending by timestamp.
    async fn find_by_participant_pair(
        &self,
        a: &ParticipantId,
        b: &ParticipantId,
    ) -> AppResult<Vec<Message>>;

    /// The most recent message per distinct counterpart of `participant`.
    /// Backs the conversation projection.
    async fn find_latest_per_counterpart(
        &self,
        participant: &ParticipantId,
    ) -> AppResult<Vec<Message>>;

    /// Every participant id the store has seen, as sender or recipient.
    async fn list_participants(&self) -> AppResult<Vec<ParticipantId>>;
}
