use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use crate::dispatch::ReplyDispatcher;
use crate::errors::{SyncError, SyncResult};
use crate::models::{Conversation, Message, MessageRole};
use crate::realtime::{PushChannelFactory, RealtimeEvent, RealtimeManager};
use crate::registry::ConversationRegistry;
use crate::session::SharedSession;
use crate::store::{PersistenceAdapter, RemoteStore, SnapshotStore};
use crate::timeline::MessageTimeline;

/// Longest message body accepted by the send pipeline, in bytes.
pub const MAX_MESSAGE_LENGTH: usize = 8000;

/// Mutable engine state, shared with the realtime forwarding task. The lock
/// is never held across an await; every suspended operation carries the
/// conversation id it belongs to, so stale completions cannot corrupt a
/// newly selected conversation.
struct EngineState {
    registry: ConversationRegistry,
    timeline: MessageTimeline,
    is_loading: bool,
    is_agent_thinking: bool,
    agent_thoughts: Vec<String>,
    error: Option<String>,
    last_attempt: Option<(String, bool)>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            registry: ConversationRegistry::new(),
            timeline: MessageTimeline::new(),
            is_loading: false,
            is_agent_thinking: false,
            agent_thoughts: Vec::new(),
            error: None,
            last_attempt: None,
        }
    }
}

/// The client-side synchronization engine: reconciles optimistic local
/// edits, realtime server events and the guest/authenticated persistence
/// split into one consistent view of conversations and the selected
/// conversation's message timeline.
pub struct ChatEngine {
    state: Arc<Mutex<EngineState>>,
    session: SharedSession,
    persistence: PersistenceAdapter,
    dispatcher: Arc<dyn ReplyDispatcher>,
    realtime: RealtimeManager,
}

impl ChatEngine {
    pub fn new(
        session: SharedSession,
        remote: Arc<dyn RemoteStore>,
        snapshot: Arc<dyn SnapshotStore>,
        dispatcher: Arc<dyn ReplyDispatcher>,
        channels: Arc<dyn PushChannelFactory>,
    ) -> Self {
        let persistence = PersistenceAdapter::new(session.clone(), remote, snapshot);
        Self {
            state: Arc::new(Mutex::new(EngineState::new())),
            session,
            persistence,
            dispatcher,
            realtime: RealtimeManager::new(channels),
        }
    }

    // ── Read surface ─────────────────────────────────────────────────────────

    /// All conversations, newest first, drafts included.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.state.lock().unwrap().registry.list()
    }

    pub fn current_conversation(&self) -> Option<Conversation> {
        self.state.lock().unwrap().registry.current().cloned()
    }

    /// Messages of the currently selected conversation, in timeline order.
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().unwrap().timeline.messages().to_vec()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().unwrap().is_loading
    }

    pub fn is_agent_thinking(&self) -> bool {
        self.state.lock().unwrap().is_agent_thinking
    }

    pub fn agent_thoughts(&self) -> Vec<String> {
        self.state.lock().unwrap().agent_thoughts.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().unwrap().error.clone()
    }

    pub fn clear_error(&self) {
        self.state.lock().unwrap().error = None;
    }

    // ── Conversation actions ─────────────────────────────────────────────────

    /// Populates the registry from the session's persistence source. Read
    /// failures degrade to an empty list. Nothing is auto-selected.
    pub async fn load_conversations(&self) {
        let conversations = self.persistence.load_conversations().await;
        info!(count = conversations.len(), "loaded conversation list");
        let mut st = self.state.lock().unwrap();
        st.registry.replace(conversations);
        // A reload can invalidate the selection (conversation deleted
        // elsewhere); its messages must not outlive it.
        if st.registry.current_id().is_none() {
            st.timeline.clear();
        }
    }

    /// Selects a conversation: rebinds the realtime channel and repopulates
    /// the timeline from persistence. Silent no-op for unknown ids.
    pub async fn select_conversation(&self, id: &str) {
        let conv = {
            let mut st = self.state.lock().unwrap();
            if !st.registry.select(id) {
                debug!(conversation_id = id, "select ignored: unknown conversation");
                return;
            }
            st.timeline.clear();
            st.is_loading = true;
            st.error = None;
            st.agent_thoughts.clear();
            st.registry.get(id).cloned().expect("selected conversation exists")
        };

        self.rebind_realtime(&conv).await;
        self.reload_timeline(&conv).await;
        self.state.lock().unwrap().is_loading = false;
    }

    /// Inserts a new draft at the head of the list, selects it and clears
    /// the timeline. Never touches persistence. Returns the draft's id.
    pub async fn create_new_conversation(&self) -> String {
        let (id, conv) = {
            let mut st = self.state.lock().unwrap();
            let id = st.registry.create_draft(self.session.is_guest());
            st.timeline.clear();
            st.error = None;
            st.agent_thoughts.clear();
            let conv = st.registry.get(&id).cloned().expect("draft just inserted");
            (id, conv)
        };
        self.rebind_realtime(&conv).await;
        id
    }

    /// Deletes a conversation. Drafts are removed from memory only; active
    /// conversations are deleted from persistence first — deletion is not
    /// optimistic, so a failure leaves the registry unchanged.
    pub async fn delete_conversation(&self, id: &str) -> SyncResult<()> {
        let conv = {
            let st = self.state.lock().unwrap();
            match st.registry.get(id) {
                Some(c) => c.clone(),
                None => return Ok(()),
            }
        };

        if !conv.is_draft() {
            if let Err(e) = self.persistence.delete_conversation(&conv).await {
                error!(conversation_id = id, "deletion failed: {e}");
                self.state.lock().unwrap().error = Some(e.to_string());
                return Err(e);
            }
        }

        self.remove_and_fix_selection(id).await;
        Ok(())
    }

    /// Replays the most recently attempted user text (and its reasoning
    /// flag) through the send pipeline.
    pub async fn retry_last_message(&self) -> SyncResult<()> {
        let attempt = self.state.lock().unwrap().last_attempt.clone();
        match attempt {
            Some((text, reasoning)) => self.send_message(&text, reasoning).await,
            None => Ok(()),
        }
    }

    // ── Send pipeline ────────────────────────────────────────────────────────

    /// Emits a user message: draft promotion, optimistic insertion, dispatch
    /// and rollback on failure. Empty input is a silent no-op. `reasoning`
    /// requests an annotated reply with a tool-call trace.
    pub async fn send_message(&self, text: &str, reasoning: bool) -> SyncResult<()> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("ignoring empty message send");
            return Ok(());
        }
        if trimmed.len() > MAX_MESSAGE_LENGTH {
            return Err(SyncError::MessageTooLong {
                max_length: MAX_MESSAGE_LENGTH,
                actual_length: trimmed.len(),
            });
        }

        // ── Resolve target, insert optimistically, promote or bump ────────
        let (conv, user_msg, was_draft) = {
            let mut st = self.state.lock().unwrap();
            let conv_id = match st.registry.current_id() {
                Some(id) => id.to_string(),
                None => st.registry.create_draft(self.session.is_guest()),
            };
            let was_draft = st.registry.get(&conv_id).map(|c| c.is_draft()).unwrap_or(false);

            let user_msg = Message::user(&conv_id, trimmed);
            st.timeline.append(user_msg.clone());
            if was_draft {
                // Promotion counts the first user message.
                st.registry.promote(&conv_id, trimmed);
            } else {
                // Optimistic: reorder the list now, count on confirmation.
                st.registry.touch(&conv_id);
            }

            st.is_loading = true;
            st.is_agent_thinking = true;
            st.error = None;
            st.agent_thoughts.clear();
            st.last_attempt = Some((trimmed.to_string(), reasoning));

            let conv = st.registry.get(&conv_id).cloned().expect("target conversation exists");
            (conv, user_msg, was_draft)
        };

        if conv.is_guest {
            self.send_guest(conv, user_msg, trimmed, reasoning, was_draft).await
        } else {
            self.send_authenticated(conv, trimmed, reasoning, was_draft).await
        }
    }

    /// Guest sends are synchronous: the assistant reply comes back on the
    /// same call and the snapshot is rewritten only after it does, so a
    /// failed send never dirties persisted state.
    async fn send_guest(
        &self,
        conv: Conversation,
        user_msg: Message,
        text: &str,
        reasoning: bool,
        was_draft: bool,
    ) -> SyncResult<()> {
        match self.dispatcher.send(text, &conv.id, reasoning).await {
            Ok(reply) => {
                let assistant =
                    Message::assistant(&conv.id, reply.text, reply.tool_calls, reply.duration_ms);
                let conv_record = {
                    let mut st = self.state.lock().unwrap();
                    // Guest confirmation is synchronous: count the user
                    // message now (promotion already counted it for drafts),
                    // then the assistant reply.
                    if !was_draft {
                        st.registry.bump_on_incoming_message(&conv.id);
                    }
                    st.registry.bump_on_incoming_message(&conv.id);
                    // The reply targets its original conversation: only the
                    // visible timeline is gated on current selection.
                    if st.registry.current_id() == Some(conv.id.as_str()) {
                        st.timeline.append(assistant.clone());
                    }
                    st.is_loading = false;
                    st.is_agent_thinking = false;
                    st.agent_thoughts.clear();
                    st.registry.get(&conv.id).cloned()
                };
                if let Some(record) = conv_record {
                    if let Err(e) = self.persistence.record_guest_exchange(
                        &record,
                        &[user_msg, assistant],
                    ) {
                        warn!(conversation_id = %conv.id, "guest snapshot write failed: {e}");
                    }
                }
                Ok(())
            }
            Err(e) => {
                self.rollback_send(&conv.id, text, was_draft, &e).await;
                Err(e)
            }
        }
    }

    /// Authenticated sends fire-and-return; the reply arrives exclusively
    /// through the push channel, which clears the loading/thinking flags on
    /// assistant arrival. Only a failure of the dispatch call itself rolls
    /// back.
    async fn send_authenticated(
        &self,
        conv: Conversation,
        text: &str,
        reasoning: bool,
        was_draft: bool,
    ) -> SyncResult<()> {
        self.ensure_channel(&conv).await;
        match self
            .dispatcher
            .dispatch(text, &conv.id, reasoning, &self.session.identity_key())
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                self.rollback_send(&conv.id, text, was_draft, &e).await;
                Err(e)
            }
        }
    }

    /// Undoes a failed optimistic send. A just-promoted draft is removed
    /// from the registry entirely; an already-active conversation only has
    /// its count decremented. Keyed by conversation id throughout, so a
    /// rollback landing after a selection change cannot touch the wrong
    /// timeline.
    async fn rollback_send(&self, conv_id: &str, text: &str, was_promoted: bool, err: &SyncError) {
        error!(conversation_id = conv_id, "send failed, rolling back: {err}");
        let next = {
            let mut st = self.state.lock().unwrap();
            st.timeline.remove_by_content(conv_id, text);
            let next = if was_promoted {
                let was_selected = st.registry.current_id() == Some(conv_id);
                let next = st.registry.remove(conv_id);
                if was_selected {
                    st.timeline.clear();
                }
                next.and_then(|id| st.registry.get(&id).cloned())
            } else {
                st.registry.rollback_message(conv_id);
                None
            };
            st.is_loading = false;
            st.is_agent_thinking = false;
            st.agent_thoughts.clear();
            st.error = Some(err.to_string());
            next
        };

        // Undoing a promotion moved the selection to the new head; bring
        // its channel and timeline along without clearing the surfaced
        // error.
        match next {
            Some(conv) => {
                self.rebind_realtime(&conv).await;
                self.reload_timeline(&conv).await;
            }
            None => {
                // Only tear down a channel still bound to the rolled-back
                // conversation; the user may have selected another one while
                // the dispatch was in flight.
                if was_promoted
                    && self.realtime.open_conversation().await.as_deref() == Some(conv_id)
                {
                    self.realtime.close().await;
                }
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────────────────

    /// Loads a conversation's history from persistence and installs it,
    /// unless the selection moved while the read was in flight.
    async fn reload_timeline(&self, conv: &Conversation) {
        let messages = self.persistence.load_messages(conv).await;
        let mut st = self.state.lock().unwrap();
        if st.registry.current_id() == Some(conv.id.as_str()) {
            st.timeline.load(messages);
        }
    }

    /// Close-then-open rebind of the single realtime channel. Guest
    /// conversations never get a channel; their replies come back
    /// synchronously from the dispatcher.
    async fn rebind_realtime(&self, conv: &Conversation) {
        if conv.is_guest {
            self.realtime.close().await;
            return;
        }
        let state = Arc::clone(&self.state);
        self.realtime
            .bind(&conv.id, move |event| apply_realtime_event(&state, event))
            .await;
    }

    async fn ensure_channel(&self, conv: &Conversation) {
        if self.realtime.open_conversation().await.as_deref() != Some(conv.id.as_str()) {
            self.rebind_realtime(conv).await;
        }
    }

    /// Removes a conversation from the registry; when it was the selected
    /// one, the newest remaining conversation takes over (channel rebound,
    /// timeline reloaded) or the view empties out.
    async fn remove_and_fix_selection(&self, id: &str) {
        let (was_selected, next) = {
            let mut st = self.state.lock().unwrap();
            let was_selected = st.registry.current_id() == Some(id);
            let next = st.registry.remove(id);
            if was_selected {
                st.timeline.clear();
            }
            (was_selected, next.and_then(|next_id| st.registry.get(&next_id).cloned()))
        };

        if !was_selected {
            return;
        }
        match next {
            Some(conv) => {
                self.rebind_realtime(&conv).await;
                self.reload_timeline(&conv).await;
            }
            None => self.realtime.close().await,
        }
    }
}

/// Applies one inbound push event to the shared state, keyed by the event's
/// own conversation id — never by current selection.
fn apply_realtime_event(state: &Mutex<EngineState>, event: RealtimeEvent) {
    match event {
        RealtimeEvent::NewMessage { message } => {
            // User messages are already present from optimistic insertion;
            // accepting the echo would risk a second copy under a
            // server-assigned id.
            if message.role == MessageRole::User {
                return;
            }
            let mut st = state.lock().unwrap();
            let conv_id = message.conversation_id.clone();
            if st.registry.get(&conv_id).is_none() {
                warn!(conversation_id = %conv_id, "realtime event for unknown conversation");
                return;
            }
            st.registry.bump_on_incoming_message(&conv_id);
            let selected = st.registry.current_id() == Some(conv_id.as_str());
            let is_assistant = message.role == MessageRole::Assistant;
            if selected {
                st.timeline.append(message);
            }
            if selected && is_assistant {
                st.is_agent_thinking = false;
                st.agent_thoughts.clear();
                st.is_loading = false;
            }
        }
        RealtimeEvent::Thought { conversation_id, text } => {
            let mut st = state.lock().unwrap();
            if st.registry.current_id() == Some(conversation_id.as_str()) {
                st.agent_thoughts.push(text);
            }
        }
    }
}
