use crate::models::{Message, MessageStatus};
use serde::{Deserialize, Serialize};

/// Events pushed from the server to a connected client. Closed set with
/// fixed fields per variant; anything a client receives is one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Fan-out to the recipient of a freshly persisted message.
    #[serde(rename = "new_message")]
    NewMessage { message: Message },

    /// Confirmation to the sender's own handle (covers multi-tab clients).
    #[serde(rename = "message_sent")]
    MessageSent { message: Message, duplicate: bool },

    /// A status transition on a message this client originally sent.
    #[serde(rename = "message_status_updated")]
    MessageStatusUpdated {
        message_id: String,
        status: MessageStatus,
    },

    /// Direct acknowledgment of a `send` received over the socket. Mirrors
    /// the HTTP response body of the POST send endpoint; `delivered: false`
    /// tells the client to mark its pending entry failed.
    #[serde(rename = "send_ack")]
    SendAck {
        message_id: Option<String>,
        delivered: bool,
        duplicate: bool,
    },

    /// This connection was superseded by a newer registration for the same
    /// participant; the receiving loop should terminate.
    #[serde(rename = "connection_replaced")]
    ConnectionReplaced,
}

/// Events a client may send over the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "send")]
    Send {
        #[serde(default)]
        client_correlation_id: Option<String>,
        recipient_id: String,
        #[serde(default)]
        body: String,
    },
    /// Read receipt / delivery confirmation for a message this client
    /// received.
    #[serde(rename = "mark_read")]
    MarkRead {
        message_id: String,
        #[serde(default = "default_read_status")]
        status: MessageStatus,
    },
}

fn default_read_status() -> MessageStatus {
    MessageStatus::Read
}
