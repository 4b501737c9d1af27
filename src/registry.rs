use chrono::Utc;
use tracing::debug;

use crate::models::{derive_title, Conversation, Lifecycle};

/// Owns the ordered conversation collection (drafts included) and the
/// current-selection pointer. Pure in-memory component: persistence and
/// subscription side effects happen around it, in the engine.
#[derive(Debug, Default)]
pub struct ConversationRegistry {
    conversations: Vec<Conversation>,
    current: Option<String>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All conversations, newest first by `updated_at`, drafts included.
    pub fn list(&self) -> Vec<Conversation> {
        let mut out = self.conversations.clone();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        out
    }

    /// Replaces the collection with freshly loaded conversations. Any
    /// in-memory drafts are dropped; the selection pointer is kept only if
    /// it still resolves.
    pub fn replace(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations;
        if let Some(id) = &self.current {
            if self.get(id).is_none() {
                self.current = None;
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.current.as_deref().and_then(|id| self.get(id))
    }

    /// Sets the selection pointer. No-op returning `false` if `id` is
    /// absent. Re-selecting the already-current conversation still counts:
    /// callers use it to rebind the subscription and reload the timeline.
    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.current = Some(id.to_string());
        true
    }

    pub fn clear_selection(&mut self) {
        self.current = None;
    }

    /// Inserts a new draft at the head of the list and selects it. Never
    /// touches persistence.
    pub fn create_draft(&mut self, is_guest: bool) -> String {
        let draft = Conversation::draft(is_guest);
        let id = draft.id.clone();
        debug!(conversation_id = %id, "created draft conversation");
        self.conversations.insert(0, draft);
        self.current = Some(id.clone());
        id
    }

    /// Converts a draft into an active conversation: derived title, message
    /// count of one, bumped timestamp. Idempotent — an already-active
    /// conversation is left untouched.
    pub fn promote(&mut self, id: &str, first_message: &str) {
        if let Some(conv) = self.get_mut(id) {
            if conv.lifecycle != Lifecycle::Draft {
                return;
            }
            conv.lifecycle = Lifecycle::Active;
            conv.title = derive_title(first_message);
            conv.message_count = 1;
            conv.updated_at = Utc::now();
            debug!(conversation_id = %id, title = %conv.title, "promoted draft to active");
        }
    }

    /// Removes a conversation from the in-memory list. If it was selected,
    /// the newest remaining conversation becomes the selection, or the
    /// selection is cleared when the list is empty. Returns the new
    /// selection (if any changed hands).
    pub fn remove(&mut self, id: &str) -> Option<String> {
        self.conversations.retain(|c| c.id != id);
        if self.current.as_deref() == Some(id) {
            self.current = self.list().first().map(|c| c.id.clone());
            return self.current.clone();
        }
        None
    }

    /// Bumps only the `updated_at` ordering key. Used for optimistic
    /// insertions: `message_count` tracks confirmed messages and is not
    /// incremented until confirmation arrives.
    pub fn touch(&mut self, id: &str) {
        if let Some(conv) = self.get_mut(id) {
            conv.updated_at = Utc::now();
        }
    }

    /// Records one confirmed incoming message: bumps the count and the
    /// `updated_at` ordering key.
    pub fn bump_on_incoming_message(&mut self, id: &str) {
        if let Some(conv) = self.get_mut(id) {
            conv.message_count += 1;
            conv.updated_at = Utc::now();
        }
    }

    /// Rolls one optimistic message back out of the count, floored at zero.
    pub fn rollback_message(&mut self, id: &str) {
        if let Some(conv) = self.get_mut(id) {
            conv.message_count = conv.message_count.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_orders_newest_first() {
        let mut reg = ConversationRegistry::new();
        let a = reg.create_draft(true);
        let b = reg.create_draft(true);
        reg.promote(&b, "second");
        let listed = reg.list();
        assert_eq!(listed[0].id, b);
        assert_eq!(listed[1].id, a);
    }

    #[test]
    fn select_is_a_noop_for_unknown_ids() {
        let mut reg = ConversationRegistry::new();
        let id = reg.create_draft(false);
        assert!(!reg.select("missing"));
        assert_eq!(reg.current_id(), Some(id.as_str()));
    }

    #[test]
    fn promote_is_idempotent() {
        let mut reg = ConversationRegistry::new();
        let id = reg.create_draft(true);
        reg.promote(&id, "Find flights to Tokyo");
        let title = reg.get(&id).unwrap().title.clone();
        reg.promote(&id, "something else entirely");
        let conv = reg.get(&id).unwrap();
        assert_eq!(conv.title, title);
        assert_eq!(conv.message_count, 1);
        assert_eq!(conv.lifecycle, Lifecycle::Active);
    }

    #[test]
    fn removing_the_selected_conversation_selects_the_new_head() {
        let mut reg = ConversationRegistry::new();
        let a = reg.create_draft(true);
        let b = reg.create_draft(true);
        assert_eq!(reg.current_id(), Some(b.as_str()));
        reg.remove(&b);
        assert_eq!(reg.current_id(), Some(a.as_str()));
        reg.remove(&a);
        assert_eq!(reg.current_id(), None);
    }

    #[test]
    fn rollback_never_goes_negative() {
        let mut reg = ConversationRegistry::new();
        let id = reg.create_draft(true);
        reg.rollback_message(&id);
        assert_eq!(reg.get(&id).unwrap().message_count, 0);
    }
}
