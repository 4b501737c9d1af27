//! Client-side conversation/message synchronization engine for a
//! conversational travel-planning app.
//!
//! The engine reconciles three partially-overlapping sources of truth:
//! optimistic local edits, a push-based realtime channel delivering
//! server-confirmed events, and a persistence layer that differs by session
//! mode (ephemeral per-session snapshots for guests, an API-backed store for
//! authenticated users). See [`ChatEngine`] for the orchestrating facade.

pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod models;
pub mod realtime;
pub mod registry;
pub mod session;
pub mod store;
pub mod timeline;

pub use dispatch::{AgentReply, ReplyDispatcher};
pub use engine::{ChatEngine, MAX_MESSAGE_LENGTH};
pub use errors::{SyncError, SyncResult};
pub use models::{
    derive_title, Conversation, Lifecycle, Message, MessageRole, ToolCall, ToolCallStatus,
    DRAFT_TITLE, TITLE_MAX_CHARS,
};
pub use realtime::{EventStream, PushChannelFactory, RealtimeEvent, RealtimeManager};
pub use registry::ConversationRegistry;
pub use session::{SessionResolver, SharedSession, StaticSession};
pub use store::{
    fetch_all_messages, GuestSnapshot, MemorySnapshotStore, MessagePage, PersistenceAdapter,
    RemoteStore, SnapshotStore, MESSAGE_PAGE_SIZE,
};
pub use timeline::MessageTimeline;
