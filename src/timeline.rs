use crate::models::Message;

/// Owns the in-memory message sequence for the currently selected
/// conversation only. Messages for other conversations are re-fetched (or
/// re-read from the guest snapshot) on selection.
#[derive(Debug, Default)]
pub struct MessageTimeline {
    messages: Vec<Message>,
}

impl MessageTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Replaces the sequence with freshly loaded messages, ascending by
    /// timestamp. The only point where the timeline reorders anything.
    pub fn load(&mut self, mut messages: Vec<Message>) {
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        self.messages = messages;
    }

    /// Appends to the tail. No-op when a message with the same id is already
    /// present — the single choke point guaranteeing the timeline never
    /// holds two messages with one id, however optimistic insertion and
    /// realtime delivery interleave.
    pub fn append(&mut self, message: Message) {
        if self.messages.iter().any(|m| m.id == message.id) {
            return;
        }
        self.messages.push(message);
    }

    /// Removes the most recent message matching `conversation_id` and
    /// `content`. Used only for rollback of a failed optimistic user
    /// message; taking the last match avoids deleting an earlier legitimate
    /// duplicate of the same text.
    pub fn remove_by_content(&mut self, conversation_id: &str, content: &str) {
        if let Some(idx) = self
            .messages
            .iter()
            .rposition(|m| m.conversation_id == conversation_id && m.content == content)
        {
            self.messages.remove(idx);
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
