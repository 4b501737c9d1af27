pub mod remote;
pub mod snapshot;

use std::sync::Arc;
use tracing::{error, warn};

use crate::errors::{SyncError, SyncResult};
use crate::models::{Conversation, Message};
use crate::session::SharedSession;

pub use remote::{fetch_all_messages, MessagePage, RemoteStore, MESSAGE_PAGE_SIZE};
pub use snapshot::{GuestSnapshot, MemorySnapshotStore, SnapshotStore};

/// Selects between the two persistence strategies. The choice is made from
/// each conversation's `is_guest` flag, fixed at creation, so invariants
/// hold per-conversation rather than per-global-mode.
#[derive(Clone)]
pub struct PersistenceAdapter {
    session: SharedSession,
    remote: Arc<dyn RemoteStore>,
    snapshot: Arc<dyn SnapshotStore>,
}

impl PersistenceAdapter {
    pub fn new(
        session: SharedSession,
        remote: Arc<dyn RemoteStore>,
        snapshot: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self { session, remote, snapshot }
    }

    /// Loads the conversation list for the current session. Read failures
    /// degrade to an empty list, never a caller-visible fault.
    pub async fn load_conversations(&self) -> Vec<Conversation> {
        if self.session.is_guest() {
            match self.snapshot.read(&self.session.identity_key()) {
                Ok(Some(snapshot)) => snapshot.conversations,
                Ok(None) => Vec::new(),
                Err(e) => {
                    warn!("Guest snapshot read failed, starting empty: {e}");
                    Vec::new()
                }
            }
        } else {
            match self.remote.list_for_user(&self.session.identity_key()).await {
                Ok(conversations) => conversations,
                Err(e) => {
                    warn!("Remote conversation fetch failed, starting empty: {e}");
                    Vec::new()
                }
            }
        }
    }

    /// Loads the full message history of one conversation, branching on the
    /// strategy the conversation was created with. Read failures degrade to
    /// an empty timeline.
    pub async fn load_messages(&self, conversation: &Conversation) -> Vec<Message> {
        if conversation.is_guest {
            match self.snapshot.read(&self.session.identity_key()) {
                Ok(Some(snapshot)) => snapshot
                    .messages
                    .get(&conversation.id)
                    .cloned()
                    .unwrap_or_default(),
                Ok(None) => Vec::new(),
                Err(e) => {
                    warn!(
                        conversation_id = %conversation.id,
                        "Guest snapshot read failed, empty timeline: {e}"
                    );
                    Vec::new()
                }
            }
        } else {
            match fetch_all_messages(
                self.remote.as_ref(),
                &self.session.identity_key(),
                &conversation.id,
            )
            .await
            {
                Ok(messages) => messages,
                Err(e) => {
                    warn!(
                        conversation_id = %conversation.id,
                        "Remote message fetch failed, empty timeline: {e}"
                    );
                    Vec::new()
                }
            }
        }
    }

    /// Records a confirmed guest exchange: upserts the conversation record
    /// and appends the given messages, rewriting the whole snapshot. Drafts
    /// are never written — callers persist only after promotion.
    pub fn record_guest_exchange(
        &self,
        conversation: &Conversation,
        messages: &[Message],
    ) -> SyncResult<()> {
        debug_assert!(!conversation.is_draft());
        let key = self.session.identity_key();
        let mut snapshot = self.snapshot.read(&key)?.unwrap_or_default();
        snapshot.upsert_conversation(conversation.clone());
        snapshot.append_messages(&conversation.id, messages);
        self.snapshot.write(&key, &snapshot)
    }

    /// Deletes a persisted conversation, cascading to its messages. Not
    /// optimistic: the caller removes the conversation from its registry
    /// only after this succeeds.
    pub async fn delete_conversation(&self, conversation: &Conversation) -> SyncResult<()> {
        if conversation.is_guest {
            let key = self.session.identity_key();
            let mut snapshot = self.snapshot.read(&key)?.unwrap_or_default();
            snapshot.remove_conversation(&conversation.id);
            self.snapshot.write(&key, &snapshot)
        } else {
            self.remote
                .delete_conversation(&self.session.identity_key(), &conversation.id)
                .await
                .map_err(|e| {
                    error!(conversation_id = %conversation.id, "Remote deletion failed: {e}");
                    match e {
                        already @ SyncError::DeletionFailed { .. } => already,
                        other => SyncError::deletion(&conversation.id, other.to_string()),
                    }
                })
        }
    }
}
