use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Maximum number of characters of the first user message used as a
/// conversation title before truncating.
pub const TITLE_MAX_CHARS: usize = 50;

/// Placeholder title shown while a conversation is still a draft.
pub const DRAFT_TITLE: &str = "New Chat";

/// Lifecycle of a conversation.
///
/// A `Draft` exists only in memory: it has no persisted record anywhere and
/// carries a zero message count. It becomes `Active` on successful
/// first-message confirmation. Modeled as an enum (not a boolean) so list
/// and counting code cannot accidentally treat a draft as durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Draft,
    Active,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: u32,
    pub is_guest: bool,
    pub lifecycle: Lifecycle,
}

impl Conversation {
    /// Creates a new in-memory draft. The persistence strategy (`is_guest`)
    /// is fixed here for the conversation's whole lifetime.
    pub fn draft(is_guest: bool) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: DRAFT_TITLE.to_string(),
            created_at: now,
            updated_at: now,
            message_count: 0,
            is_guest,
            lifecycle: Lifecycle::Draft,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.lifecycle == Lifecycle::Draft
    }
}

/// Derives a conversation title from the first user message: trimmed,
/// truncated to [`TITLE_MAX_CHARS`] characters with an ellipsis appended
/// when truncated.
pub fn derive_title(first_message: &str) -> String {
    let t = first_message.trim();
    if t.chars().count() > TITLE_MAX_CHARS {
        format!("{}…", t.chars().take(TITLE_MAX_CHARS).collect::<String>())
    } else {
        t.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for MessageRole {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// Status of a single tool invocation in an agent reasoning trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    Running,
    Completed,
    Error,
}

/// One tool invocation performed while producing an assistant reply.
/// Immutable once attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    pub input_params: HashMap<String, Value>,
    pub output: String,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl Message {
    /// A user-authored message with a client-generated id, inserted
    /// optimistically before any network interaction completes.
    pub fn user(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            tool_calls: None,
            execution_time_ms: None,
        }
    }

    /// An assistant reply, optionally carrying its tool-call trace.
    pub fn assistant(
        conversation_id: impl Into<String>,
        content: impl Into<String>,
        tool_calls: Option<Vec<ToolCall>>,
        execution_time_ms: Option<u64>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            tool_calls,
            execution_time_ms,
        }
    }
}
