use async_trait::async_trait;

use crate::errors::SyncResult;
use crate::models::{Conversation, Message};

/// Page size used when draining a conversation's message history.
pub const MESSAGE_PAGE_SIZE: u32 = 50;

/// One page of a paginated message fetch.
#[derive(Debug, Clone)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub has_more: bool,
}

/// Boundary to the API-backed conversation store used for authenticated
/// sessions. All calls are keyed by the bearer credential.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_for_user(&self, credential: &str) -> SyncResult<Vec<Conversation>>;

    /// Fetches one page of messages, ascending by timestamp. Pages are
    /// 1-based.
    async fn list_messages(
        &self,
        credential: &str,
        conversation_id: &str,
        page: u32,
        page_size: u32,
    ) -> SyncResult<MessagePage>;

    async fn delete_conversation(&self, credential: &str, conversation_id: &str)
        -> SyncResult<()>;
}

/// Drains every page of a conversation's history into one sequence.
pub async fn fetch_all_messages(
    store: &dyn RemoteStore,
    credential: &str,
    conversation_id: &str,
) -> SyncResult<Vec<Message>> {
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let batch = store
            .list_messages(credential, conversation_id, page, MESSAGE_PAGE_SIZE)
            .await?;
        all.extend(batch.messages);
        if !batch.has_more {
            break;
        }
        page += 1;
    }
    Ok(all)
}
