use crate::models::ParticipantId;
use crate::websocket::message_types::ServerEvent;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

/// Addressable reference to one live connection. Sends are non-blocking;
/// a closed receiver just means the peer went away mid-send.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    connection_id: Uuid,
    tx: UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new() -> (Self, UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = unbounded_channel();
        (
            Self {
                connection_id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Push an event to the connection. Returns false when the receiving
    /// side is already gone.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// In-memory participant -> live connection mapping. Exactly one handle per
/// online participant; a second registration overwrites the first
/// (last-write-wins). Injected, never a process global.
///
/// Mutations take a std lock and never cross an await point.
#[derive(Default, Clone)]
pub struct PresenceTable {
    inner: Arc<RwLock<HashMap<ParticipantId, ConnectionHandle>>>,
}

impl PresenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `participant`. Returns the handle
    /// that was displaced, if any, so the caller can notify and close the
    /// stale connection instead of leaving it dangling.
    pub fn register(
        &self,
        participant: ParticipantId,
        handle: ConnectionHandle,
    ) -> Option<ConnectionHandle> {
        let mut guard = self.inner.write().expect("presence lock poisoned");
        guard.insert(participant, handle)
    }

    /// `None` means offline: do not attempt a push.
    pub fn lookup(&self, participant: &ParticipantId) -> Option<ConnectionHandle> {
        let guard = self.inner.read().expect("presence lock poisoned");
        guard.get(participant).cloned()
    }

    /// Remove the entry owning `handle`. Disconnect events carry only the
    /// handle, so the entry is found by connection id, not participant id.
    /// Idempotent; a handle already displaced by a newer registration does
    /// not remove the newer entry.
    pub fn unregister(&self, handle: &ConnectionHandle) {
        let mut guard = self.inner.write().expect("presence lock poisoned");
        guard.retain(|_, h| h.connection_id != handle.connection_id);
    }

    pub fn online_count(&self) -> usize {
        self.inner.read().expect("presence lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::normalize(s)
    }

    #[test]
    fn register_then_lookup() {
        let presence = PresenceTable::new();
        let (handle, _rx) = ConnectionHandle::new();
        assert!(presence.register(pid("alice"), handle.clone()).is_none());
        let found = presence.lookup(&pid("alice")).unwrap();
        assert_eq!(found.connection_id(), handle.connection_id());
        assert!(presence.lookup(&pid("bob")).is_none());
    }

    #[test]
    fn second_registration_wins_and_returns_old_handle() {
        let presence = PresenceTable::new();
        let (first, _rx1) = ConnectionHandle::new();
        let (second, _rx2) = ConnectionHandle::new();
        presence.register(pid("alice"), first.clone());
        let displaced = presence.register(pid("alice"), second.clone()).unwrap();
        assert_eq!(displaced.connection_id(), first.connection_id());
        assert_eq!(
            presence.lookup(&pid("alice")).unwrap().connection_id(),
            second.connection_id()
        );
    }

    #[test]
    fn unregister_is_by_handle_and_idempotent() {
        let presence = PresenceTable::new();
        let (stale, _rx1) = ConnectionHandle::new();
        let (fresh, _rx2) = ConnectionHandle::new();
        presence.register(pid("alice"), stale.clone());
        presence.register(pid("alice"), fresh.clone());

        // The stale connection disconnecting must not evict the fresh one.
        presence.unregister(&stale);
        assert!(presence.lookup(&pid("alice")).is_some());

        presence.unregister(&fresh);
        assert!(presence.lookup(&pid("alice")).is_none());
        presence.unregister(&fresh);
        assert_eq!(presence.online_count(), 0);
    }
}
