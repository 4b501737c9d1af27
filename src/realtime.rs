use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::SyncResult;
use crate::models::Message;

/// Push event delivered over a conversation's realtime channel.
/// Internally tagged with `kind` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RealtimeEvent {
    /// A server-confirmed message for the channel's conversation.
    NewMessage { message: Message },
    /// Transient reasoning trace emitted while the agent works on a reply.
    /// Scoped to a single send; never persisted.
    Thought { conversation_id: String, text: String },
}

pub type EventStream = BoxStream<'static, RealtimeEvent>;

/// Boundary to the push-event transport. Opening yields a stream of events
/// for exactly one conversation; the stream ending means the channel closed
/// (error or server-side teardown) and is not reconnected here.
pub trait PushChannelFactory: Send + Sync {
    fn open(&self, conversation_id: &str) -> SyncResult<EventStream>;
}

struct OpenChannel {
    conversation_id: String,
    task: JoinHandle<()>,
}

/// Binds at most one push channel to the current conversation. Rebinding is
/// strictly close-then-open so two channels can never deliver into the same
/// timeline; closing aborts the forwarding task and waits for it to settle.
pub struct RealtimeManager {
    factory: Arc<dyn PushChannelFactory>,
    slot: tokio::sync::Mutex<Option<OpenChannel>>,
}

impl RealtimeManager {
    pub fn new(factory: Arc<dyn PushChannelFactory>) -> Self {
        Self { factory, slot: tokio::sync::Mutex::new(None) }
    }

    /// The conversation the open channel (if any) is bound to.
    pub async fn open_conversation(&self) -> Option<String> {
        self.slot.lock().await.as_ref().map(|c| c.conversation_id.clone())
    }

    /// Closes the current channel, if one is open.
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        Self::teardown(slot.take()).await;
    }

    /// Closes any open channel, then opens one for `conversation_id` and
    /// forwards its events into `on_event`. A factory failure degrades
    /// silently to no-realtime.
    pub async fn bind<F>(&self, conversation_id: &str, mut on_event: F)
    where
        F: FnMut(RealtimeEvent) + Send + 'static,
    {
        let mut slot = self.slot.lock().await;
        Self::teardown(slot.take()).await;

        let mut stream = match self.factory.open(conversation_id) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(conversation_id, "Failed to open realtime channel: {e}");
                return;
            }
        };

        let id = conversation_id.to_string();
        let task = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                on_event(event);
            }
            debug!(conversation_id = %id, "realtime channel closed");
        });

        *slot = Some(OpenChannel { conversation_id: conversation_id.to_string(), task });
    }

    async fn teardown(channel: Option<OpenChannel>) {
        if let Some(open) = channel {
            debug!(conversation_id = %open.conversation_id, "closing realtime channel");
            open.task.abort();
            let _ = open.task.await;
        }
    }
}
