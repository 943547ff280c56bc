use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized participant handle (phone-number-like string).
///
/// All comparisons and storage go through this type; the constructor trims
/// whitespace and strips a single leading `+` so `"+49151..."` and
/// `"49151..."` address the same party.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        let stripped = trimmed.strip_prefix('+').unwrap_or(trimmed);
        Self(stripped.trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delivery lifecycle of a single message. Transitions only move forward;
/// `Failed` is terminal and reachable from `Pending`/`Sent` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    fn rank(self) -> u8 {
        match self {
            MessageStatus::Pending => 0,
            MessageStatus::Sent => 1,
            MessageStatus::Delivered => 2,
            MessageStatus::Read => 3,
            MessageStatus::Failed => 4,
        }
    }

    /// Whether a stored message at `self` may move to `next`.
    pub fn allows_transition_to(self, next: MessageStatus) -> bool {
        match next {
            MessageStatus::Failed => {
                matches!(self, MessageStatus::Pending | MessageStatus::Sent)
            }
            _ => !matches!(self, MessageStatus::Failed) && next.rank() > self.rank(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
            MessageStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(MessageStatus::Pending),
            "sent" => Some(MessageStatus::Sent),
            "delivered" => Some(MessageStatus::Delivered),
            "read" => Some(MessageStatus::Read),
            "failed" => Some(MessageStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authoritative message record. `message_id` is the dedup key; when the
/// sending client supplied a correlation id it doubles as the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub client_correlation_id: Option<String>,
    pub sender_id: ParticipantId,
    pub recipient_id: ParticipantId,
    pub body: String,
    pub sent_at_ms: i64,
    pub status: MessageStatus,
}

impl Message {
    /// The counterpart of `participant` in this message, if they are a party
    /// to it at all.
    pub fn counterpart_of(&self, participant: &ParticipantId) -> Option<&ParticipantId> {
        if &self.sender_id == participant {
            Some(&self.recipient_id)
        } else if &self.recipient_id == participant {
            Some(&self.sender_id)
        } else {
            None
        }
    }
}

/// Client send request as it arrives over HTTP or the socket, before
/// normalization and validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendIntent {
    #[serde(default)]
    pub client_correlation_id: Option<String>,
    pub sender_id: String,
    pub recipient_id: String,
    #[serde(default)]
    pub body: String,
}
