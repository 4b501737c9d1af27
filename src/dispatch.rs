use async_trait::async_trait;

use crate::errors::SyncResult;
use crate::models::ToolCall;

/// Reply produced by the travel agent for a guest (synchronous) send.
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub text: String,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub duration_ms: Option<u64>,
}

/// Boundary to the reply-producing service. Request construction, retries
/// and timeouts are the transport's responsibility; the engine only sees an
/// eventually-settling call.
#[async_trait]
pub trait ReplyDispatcher: Send + Sync {
    /// Guest-mode send: blocks until the assistant reply is available and
    /// returns it directly. `reasoning` requests an annotated response with
    /// a tool-call trace.
    async fn send(
        &self,
        text: &str,
        conversation_id: &str,
        reasoning: bool,
    ) -> SyncResult<AgentReply>;

    /// Authenticated-mode send: fires the request and returns immediately.
    /// The assistant reply arrives later through the push channel.
    async fn dispatch(
        &self,
        text: &str,
        conversation_id: &str,
        reasoning: bool,
        credential: &str,
    ) -> SyncResult<()>;
}
