use crate::error::{AppError, AppResult};
use crate::models::{Message, MessageStatus, ParticipantId};
use crate::store::MessageStore;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres, Row};

/// SQL expression ordering statuses for the monotonic-forward guard.
const STATUS_RANK: &str = "CASE {} \
     WHEN 'pending' THEN 0 WHEN 'sent' THEN 1 WHEN 'delivered' THEN 2 \
     WHEN 'read' THEN 3 WHEN 'failed' THEN 4 END";

/// Durable store backed by Postgres. Uniqueness of `message_id` is a
/// primary-key constraint, so the dedup check-then-insert is a single
/// atomic `INSERT .. ON CONFLICT DO NOTHING`.
#[derive(Clone)]
pub struct PgMessageStore {
    db: Pool<Postgres>,
}

impl PgMessageStore {
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        let store = Self { db };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn from_pool(db: Pool<Postgres>) -> Self {
        Self { db }
    }

    /// Idempotent schema bootstrap; full migration tooling is owned by the
    /// deployment, this only covers the one collection the engine writes.
    pub async fn ensure_schema(&self) -> AppResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (\
               message_id TEXT PRIMARY KEY,\
               client_correlation_id TEXT,\
               sender_id TEXT NOT NULL,\
               recipient_id TEXT NOT NULL,\
               body TEXT NOT NULL DEFAULT '',\
               sent_at_ms BIGINT NOT NULL,\
               status TEXT NOT NULL\
             )",
        )
        .execute(&self.db)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_pair \
             ON messages (sender_id, recipient_id, sent_at_ms)",
        )
        .execute(&self.db)
        .await?;
        Ok(())
    }

    fn row_to_message(row: &sqlx::postgres::PgRow) -> AppResult<Message> {
        let status_text: String = row.get("status");
        let status = MessageStatus::parse(&status_text)
            .ok_or_else(|| AppError::Storage(format!("unknown status '{status_text}'")))?;
        let sender: String = row.get("sender_id");
        let recipient: String = row.get("recipient_id");
        Ok(Message {
            message_id: row.get("message_id"),
            client_correlation_id: row.get("client_correlation_id"),
            sender_id: ParticipantId::normalize(&sender),
            recipient_id: ParticipantId::normalize(&recipient),
            body: row.get("body"),
            sent_at_ms: row.get("sent_at_ms"),
            status,
        })
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn upsert_on_insert(&self, message: &Message) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO messages \
               (message_id, client_correlation_id, sender_id, recipient_id, body, sent_at_ms, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (message_id) DO NOTHING",
        )
        .bind(&message.message_id)
        .bind(&message.client_correlation_id)
        .bind(message.sender_id.as_str())
        .bind(message.recipient_id.as_str())
        .bind(&message.body)
        .bind(message.sent_at_ms)
        .bind(message.status.as_str())
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_status(
        &self,
        message_id: &str,
        status: MessageStatus,
    ) -> AppResult<Option<Message>> {
        let current_rank = STATUS_RANK.replace("{}", "status");
        let next_rank = STATUS_RANK.replace("{}", "$2");
        // Forward-only, and 'failed' may only replace pending/sent.
        let sql = format!(
            "UPDATE messages SET status = $2 \
             WHERE message_id = $1 \
               AND status <> 'failed' \
               AND ({next_rank}) > ({current_rank}) \
               AND ($2 <> 'failed' OR status IN ('pending', 'sent')) \
             RETURNING message_id, client_correlation_id, sender_id, recipient_id, \
                       body, sent_at_ms, status",
        );
        let row = sqlx::query(&sql)
            .bind(message_id)
            .bind(status.as_str())
            .fetch_optional(&self.db)
            .await?;
        row.as_ref().map(Self::row_to_message).transpose()
    }

    async fn find_by_participant_pair(
        &self,
        a: &ParticipantId,
        b: &ParticipantId,
    ) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT message_id, client_correlation_id, sender_id, recipient_id, \
                    body, sent_at_ms, status \
             FROM messages \
             WHERE (sender_id = $1 AND recipient_id = $2) \
                OR (sender_id = $2 AND recipient_id = $1) \
             ORDER BY sent_at_ms ASC",
        )
        .bind(a.as_str())
        .bind(b.as_str())
        .fetch_all(&self.db)
        .await?;
        rows.iter().map(Self::row_to_message).collect()
    }

    async fn find_latest_per_counterpart(
        &self,
        participant: &ParticipantId,
    ) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT DISTINCT ON (counterpart) \
                    message_id, client_correlation_id, sender_id, recipient_id, \
                    body, sent_at_ms, status \
             FROM ( \
               SELECT *, \
                      CASE WHEN sender_id = $1 THEN recipient_id ELSE sender_id END AS counterpart \
               FROM messages \
               WHERE sender_id = $1 OR recipient_id = $1 \
             ) m \
             ORDER BY counterpart, sent_at_ms DESC",
        )
        .bind(participant.as_str())
        .fetch_all(&self.db)
        .await?;
        rows.iter().map(Self::row_to_message).collect()
    }

    async fn list_participants(&self) -> AppResult<Vec<ParticipantId>> {
        let rows = sqlx::query(
            "SELECT DISTINCT participant FROM ( \
               SELECT sender_id AS participant FROM messages \
               UNION SELECT recipient_id FROM messages \
             ) p ORDER BY participant",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows
            .iter()
            .map(|r| {
                let id: String = r.get("participant");
                ParticipantId::normalize(&id)
            })
            .collect())
    }
}
