use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::SyncResult;
use crate::models::{Conversation, Message};

/// The single keyed record a guest session persists: full conversation and
/// message payloads, read-modify-written as a whole on every mutation.
/// Concurrent writers (e.g. two tabs) are not synchronized; the last writer
/// wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuestSnapshot {
    pub conversations: Vec<Conversation>,
    /// Messages keyed by conversation id, ascending by timestamp.
    pub messages: HashMap<String, Vec<Message>>,
}

impl GuestSnapshot {
    /// Inserts or replaces a conversation record.
    pub fn upsert_conversation(&mut self, conversation: Conversation) {
        match self.conversations.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => *existing = conversation,
            None => self.conversations.push(conversation),
        }
    }

    pub fn append_messages(&mut self, conversation_id: &str, messages: &[Message]) {
        self.messages
            .entry(conversation_id.to_string())
            .or_default()
            .extend_from_slice(messages);
    }

    /// Removes a conversation and cascades to its stored messages.
    pub fn remove_conversation(&mut self, conversation_id: &str) {
        self.conversations.retain(|c| c.id != conversation_id);
        self.messages.remove(conversation_id);
    }
}

/// Boundary to the ephemeral per-session storage used for guest
/// conversations, keyed by session identity.
pub trait SnapshotStore: Send + Sync {
    fn read(&self, session_key: &str) -> SyncResult<Option<GuestSnapshot>>;
    fn write(&self, session_key: &str, snapshot: &GuestSnapshot) -> SyncResult<()>;
}

/// In-memory snapshot store. The reference implementation for a single
/// process; embedders targeting browser storage or disk supply their own.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    records: DashMap<String, GuestSnapshot>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn read(&self, session_key: &str) -> SyncResult<Option<GuestSnapshot>> {
        Ok(self.records.get(session_key).map(|entry| entry.value().clone()))
    }

    fn write(&self, session_key: &str, snapshot: &GuestSnapshot) -> SyncResult<()> {
        self.records.insert(session_key.to_string(), snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Conversation, Lifecycle, Message};

    fn stored_conversation(id: &str) -> Conversation {
        let mut conv = Conversation::draft(true);
        conv.id = id.to_string();
        conv.lifecycle = Lifecycle::Active;
        conv.message_count = 1;
        conv
    }

    #[test]
    fn snapshot_round_trips_through_the_memory_store() {
        let store = MemorySnapshotStore::new();
        let mut snapshot = GuestSnapshot::default();
        snapshot.upsert_conversation(stored_conversation("c1"));
        snapshot.append_messages("c1", &[Message::user("c1", "hi")]);

        store.write("session-a", &snapshot).unwrap();
        let read = store.read("session-a").unwrap().unwrap();
        assert_eq!(read.conversations.len(), 1);
        assert_eq!(read.messages["c1"].len(), 1);
        assert!(store.read("session-b").unwrap().is_none());
    }

    #[test]
    fn remove_conversation_cascades_to_messages() {
        let mut snapshot = GuestSnapshot::default();
        snapshot.upsert_conversation(stored_conversation("c1"));
        snapshot.append_messages("c1", &[Message::user("c1", "hi")]);
        snapshot.remove_conversation("c1");
        assert!(snapshot.conversations.is_empty());
        assert!(snapshot.messages.is_empty());
    }
}
