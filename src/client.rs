//! Client-side reconciliation: the optimistic local view a connected client
//! keeps, and the merge rules for folding server events back into it.
//!
//! Pure state machine, no I/O; the socket loop on the client feeds events
//! in and renders from the resulting view.

use crate::models::{Message, MessageStatus, ParticipantId};
use crate::websocket::message_types::ServerEvent;
use uuid::Uuid;

/// A message as the client sees it. Until the server confirms, only the
/// correlation id is known; the authoritative id arrives with the first
/// server event that matches.
#[derive(Debug, Clone)]
pub struct LocalMessage {
    pub correlation_id: Option<String>,
    pub message_id: Option<String>,
    pub sender_id: ParticipantId,
    pub recipient_id: ParticipantId,
    pub body: String,
    pub sent_at_ms: i64,
    pub status: MessageStatus,
}

impl LocalMessage {
    fn matches(&self, correlation_id: Option<&str>, message_id: &str) -> bool {
        // Correlation id first, then the authoritative id.
        if let (Some(local), Some(incoming)) = (self.correlation_id.as_deref(), correlation_id) {
            if local == incoming {
                return true;
            }
        }
        self.message_id.as_deref() == Some(message_id)
            || self.correlation_id.as_deref() == Some(message_id)
    }

    /// Server fields win wholesale, except that status never walks
    /// backwards (a late `message_sent` must not undo a read receipt).
    fn merge_server(&mut self, server: &Message) {
        self.message_id = Some(server.message_id.clone());
        if server.client_correlation_id.is_some() {
            self.correlation_id = server.client_correlation_id.clone();
        }
        self.body = server.body.clone();
        self.sent_at_ms = server.sent_at_ms;
        if self.status.allows_transition_to(server.status) {
            self.status = server.status;
        }
    }

    /// Tick glyph for rendering, WhatsApp-style.
    pub fn status_glyph(&self) -> &'static str {
        match self.status {
            MessageStatus::Pending => "🕓",
            MessageStatus::Sent => "✓",
            MessageStatus::Delivered => "✓✓",
            MessageStatus::Read => "✓✓ (blue)",
            MessageStatus::Failed => "!",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConversation {
    pub counterpart_id: ParticipantId,
    pub messages: Vec<LocalMessage>,
    /// Arrival tiebreak for the recency sort; bumped on every mutation so
    /// equal timestamps keep a stable, flicker-free order.
    last_touched: u64,
}

impl ClientConversation {
    fn latest_timestamp(&self) -> i64 {
        self.messages.iter().map(|m| m.sent_at_ms).max().unwrap_or(0)
    }
}

/// The whole client-local state for one participant.
pub struct ClientView {
    self_id: ParticipantId,
    conversations: Vec<ClientConversation>,
    touch_counter: u64,
}

impl ClientView {
    pub fn new(self_id: ParticipantId) -> Self {
        Self {
            self_id,
            conversations: Vec::new(),
            touch_counter: 0,
        }
    }

    /// Conversation list, most recent traffic first.
    pub fn conversations(&self) -> &[ClientConversation] {
        &self.conversations
    }

    fn touch(&mut self) -> u64 {
        self.touch_counter += 1;
        self.touch_counter
    }

    fn conversation_mut(&mut self, counterpart: &ParticipantId) -> &mut ClientConversation {
        let idx = match self
            .conversations
            .iter()
            .position(|c| &c.counterpart_id == counterpart)
        {
            Some(idx) => idx,
            None => {
                self.conversations.push(ClientConversation {
                    counterpart_id: counterpart.clone(),
                    messages: Vec::new(),
                    last_touched: 0,
                });
                self.conversations.len() - 1
            }
        };
        &mut self.conversations[idx]
    }

    fn resort(&mut self) {
        // Total order: recency desc, then most recently touched first.
        self.conversations.sort_by(|a, b| {
            b.latest_timestamp()
                .cmp(&a.latest_timestamp())
                .then(b.last_touched.cmp(&a.last_touched))
        });
    }

    /// Optimistic local send: insert a `pending` entry with a fresh
    /// correlation id and move the conversation to the front. Returns the
    /// correlation id to put on the wire.
    pub fn begin_send(&mut self, recipient: &ParticipantId, body: &str) -> String {
        let correlation_id = Uuid::new_v4().to_string();
        let local = LocalMessage {
            correlation_id: Some(correlation_id.clone()),
            message_id: None,
            sender_id: self.self_id.clone(),
            recipient_id: recipient.clone(),
            body: body.to_string(),
            sent_at_ms: chrono::Utc::now().timestamp_millis(),
            status: MessageStatus::Pending,
        };
        let touched = self.touch();
        let convo = self.conversation_mut(recipient);
        convo.messages.push(local);
        convo.last_touched = touched;
        self.resort();
        correlation_id
    }

    /// Transport or storage failure on a pending send.
    pub fn mark_send_failed(&mut self, correlation_id: &str) {
        for convo in &mut self.conversations {
            for msg in &mut convo.messages {
                if msg.correlation_id.as_deref() == Some(correlation_id)
                    && msg.status.allows_transition_to(MessageStatus::Failed)
                {
                    msg.status = MessageStatus::Failed;
                }
            }
        }
    }

    /// Merge a server event into local state. Matching is by correlation id
    /// first, then message id; matched entries take the server's fields
    /// (server wins), unmatched messages are appended as new.
    pub fn apply_event(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::NewMessage { message } | ServerEvent::MessageSent { message, .. } => {
                let Some(counterpart) = message.counterpart_of(&self.self_id) else {
                    // Not addressed to this participant; ignore.
                    return;
                };
                let counterpart = counterpart.clone();
                let touched = self.touch();
                let convo = self.conversation_mut(&counterpart);
                let correlation = message.client_correlation_id.as_deref();
                match convo
                    .messages
                    .iter_mut()
                    .find(|m| m.matches(correlation, &message.message_id))
                {
                    Some(local) => local.merge_server(message),
                    None => convo.messages.push(LocalMessage {
                        correlation_id: message.client_correlation_id.clone(),
                        message_id: Some(message.message_id.clone()),
                        sender_id: message.sender_id.clone(),
                        recipient_id: message.recipient_id.clone(),
                        body: message.body.clone(),
                        sent_at_ms: message.sent_at_ms,
                        status: message.status,
                    }),
                }
                convo.last_touched = touched;
                self.resort();
            }
            ServerEvent::MessageStatusUpdated { message_id, status } => {
                for convo in &mut self.conversations {
                    for msg in &mut convo.messages {
                        if msg.matches(None, message_id)
                            && msg.status.allows_transition_to(*status)
                        {
                            msg.status = *status;
                        }
                    }
                }
            }
            ServerEvent::SendAck {
                message_id: Some(id),
                delivered: false,
                ..
            } => self.mark_send_failed(id),
            // Successful acks carry no new fields; `message_sent` does the
            // merge. Connection lifecycle has nothing to merge either.
            ServerEvent::SendAck { .. } | ServerEvent::ConnectionReplaced => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::normalize(s)
    }

    fn server_message(id: &str, correlation: Option<&str>, from: &str, to: &str, ts: i64) -> Message {
        Message {
            message_id: id.to_string(),
            client_correlation_id: correlation.map(str::to_string),
            sender_id: pid(from),
            recipient_id: pid(to),
            body: "hi".into(),
            sent_at_ms: ts,
            status: MessageStatus::Sent,
        }
    }

    #[test]
    fn optimistic_send_then_confirmation_merges_not_duplicates() {
        let mut view = ClientView::new(pid("alice"));
        let correlation = view.begin_send(&pid("bob"), "hi");

        let mut confirmed = server_message("srv-1", Some(&correlation), "alice", "bob", 100);
        confirmed.status = MessageStatus::Sent;
        view.apply_event(&ServerEvent::MessageSent {
            message: confirmed,
            duplicate: false,
        });

        let convo = &view.conversations()[0];
        assert_eq!(convo.messages.len(), 1);
        let msg = &convo.messages[0];
        assert_eq!(msg.message_id.as_deref(), Some("srv-1"));
        assert_eq!(msg.status, MessageStatus::Sent);
        assert_eq!(msg.sent_at_ms, 100);
    }

    #[test]
    fn unmatched_server_message_appends() {
        let mut view = ClientView::new(pid("bob"));
        view.apply_event(&ServerEvent::NewMessage {
            message: server_message("m1", None, "alice", "bob", 50),
        });
        assert_eq!(view.conversations().len(), 1);
        assert_eq!(view.conversations()[0].counterpart_id, pid("alice"));
        assert_eq!(view.conversations()[0].messages.len(), 1);
    }

    #[test]
    fn status_update_matches_by_id_and_never_regresses() {
        let mut view = ClientView::new(pid("alice"));
        let correlation = view.begin_send(&pid("bob"), "hi");
        view.apply_event(&ServerEvent::MessageSent {
            message: server_message("c1", Some(&correlation), "alice", "bob", 10),
            duplicate: false,
        });
        view.apply_event(&ServerEvent::MessageStatusUpdated {
            message_id: "c1".into(),
            status: MessageStatus::Read,
        });
        assert_eq!(
            view.conversations()[0].messages[0].status,
            MessageStatus::Read
        );

        // A stale delivered event after read must not regress.
        view.apply_event(&ServerEvent::MessageStatusUpdated {
            message_id: "c1".into(),
            status: MessageStatus::Delivered,
        });
        assert_eq!(
            view.conversations()[0].messages[0].status,
            MessageStatus::Read
        );
    }

    #[test]
    fn out_of_order_arrival_still_reconciles() {
        // Read receipt races ahead of the send confirmation: the local
        // pending entry is matched by correlation id when the confirmation
        // finally lands, and the later status still applies.
        let mut view = ClientView::new(pid("alice"));
        let correlation = view.begin_send(&pid("bob"), "hi");

        view.apply_event(&ServerEvent::MessageStatusUpdated {
            message_id: correlation.clone(),
            status: MessageStatus::Read,
        });
        // Pending -> read is forward, applied directly against the
        // correlation id.
        assert_eq!(
            view.conversations()[0].messages[0].status,
            MessageStatus::Read
        );

        view.apply_event(&ServerEvent::MessageSent {
            message: server_message(&correlation, Some(&correlation), "alice", "bob", 10),
            duplicate: false,
        });
        let convo = &view.conversations()[0];
        assert_eq!(convo.messages.len(), 1);
        // merge keeps read; the confirmation's `sent` would be backwards.
        assert_eq!(convo.messages[0].status, MessageStatus::Read);
    }

    #[test]
    fn new_traffic_moves_conversation_to_front() {
        let mut view = ClientView::new(pid("me"));
        view.apply_event(&ServerEvent::NewMessage {
            message: server_message("a1", None, "amy", "me", 100),
        });
        view.apply_event(&ServerEvent::NewMessage {
            message: server_message("b1", None, "ben", "me", 200),
        });
        assert_eq!(view.conversations()[0].counterpart_id, pid("ben"));

        view.apply_event(&ServerEvent::NewMessage {
            message: server_message("a2", None, "amy", "me", 300),
        });
        assert_eq!(view.conversations()[0].counterpart_id, pid("amy"));
        assert_eq!(view.conversations()[1].counterpart_id, pid("ben"));
    }

    #[test]
    fn equal_timestamps_break_ties_by_arrival() {
        let mut view = ClientView::new(pid("me"));
        view.apply_event(&ServerEvent::NewMessage {
            message: server_message("a1", None, "amy", "me", 100),
        });
        view.apply_event(&ServerEvent::NewMessage {
            message: server_message("b1", None, "ben", "me", 100),
        });
        // Same timestamp: the one touched last sorts first.
        assert_eq!(view.conversations()[0].counterpart_id, pid("ben"));
        assert_eq!(view.conversations()[1].counterpart_id, pid("amy"));
    }

    #[test]
    fn failed_send_is_marked_and_terminal() {
        let mut view = ClientView::new(pid("alice"));
        let correlation = view.begin_send(&pid("bob"), "hi");
        view.mark_send_failed(&correlation);
        assert_eq!(
            view.conversations()[0].messages[0].status,
            MessageStatus::Failed
        );
        assert_eq!(view.conversations()[0].messages[0].status_glyph(), "!");
    }
}
