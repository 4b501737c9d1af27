use thiserror::Error;

/// Top-level synchronization error. Each variant maps to one entry of the
/// engine's failure taxonomy; variants carry a human-readable message for
/// display and logging.
#[derive(Debug, Error)]
pub enum SyncError {
    // ── Validation ───────────────────────────────────────────────────────────
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Message exceeds max length of {max_length} (actual: {actual_length})")]
    MessageTooLong { max_length: usize, actual_length: usize },

    // ── Send pipeline ────────────────────────────────────────────────────────
    #[error("Failed to send message: {message}")]
    DispatchFailed { message: String },

    // ── Persistence ──────────────────────────────────────────────────────────
    #[error("Failed to read persisted state: {message}")]
    PersistenceRead { message: String },

    #[error("Failed to write guest snapshot: {message}")]
    PersistenceWrite { message: String },

    #[error("Failed to delete conversation '{conversation_id}': {message}")]
    DeletionFailed { conversation_id: String, message: String },

    // ── Realtime channel ─────────────────────────────────────────────────────
    #[error("Realtime channel closed: {message}")]
    ChannelClosed { message: String },

    // ── Registry ─────────────────────────────────────────────────────────────
    #[error("Conversation '{id}' not found")]
    ConversationNotFound { id: String },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl SyncError {
    pub fn dispatch(message: impl Into<String>) -> Self {
        SyncError::DispatchFailed { message: message.into() }
    }

    pub fn persistence_read(message: impl Into<String>) -> Self {
        SyncError::PersistenceRead { message: message.into() }
    }

    pub fn deletion(conversation_id: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::DeletionFailed {
            conversation_id: conversation_id.into(),
            message: message.into(),
        }
    }

    /// Validation failures are rejected as no-ops and never surfaced to the
    /// caller-visible `error` field.
    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::EmptyMessage | SyncError::MessageTooLong { .. })
    }

    /// Failures that degrade silently (empty list / no realtime) rather than
    /// surfacing an error.
    pub fn is_silent(&self) -> bool {
        matches!(self, SyncError::PersistenceRead { .. } | SyncError::ChannelClosed { .. })
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
