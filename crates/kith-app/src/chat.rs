//! Chat view model.
//!
//! Per-conversation chat state driven by [`ChatEvent`]s, producing
//! [`ChatAction`]s. Pure: no I/O, no clock. The session feeds it frames and
//! REST results and executes what it asks for.
//!
//! # Reconciliation
//!
//! A sent message is shown immediately as optimistic. When the server echoes
//! it back, the echo is appended and the optimistic copy removed:
//!
//! - If the echo carries a `client_id`, the optimistic message with that ID.
//! - Otherwise the first optimistic message with the same sender and content
//!   sent less than [`RECONCILE_WINDOW`] apart.
//!
//! At most one optimistic message is removed per echo.

use std::time::Duration;

use kith_proto::{
    ConnectionState, Conversation, CorrelationId, Frame, GroupMessage, OutgoingMessage,
    PrivateMessage, Timestamp, UserId,
};

use crate::{
    ChatAction, ChatEvent,
    state::{ConversationState, Message, OnlineUsers},
};

/// Echoes without a correlation ID match optimistic messages sent strictly
/// less than this far apart.
pub const RECONCILE_WINDOW: Duration = Duration::from_millis(2_000);

/// Chat view model.
#[derive(Debug, Clone)]
pub struct ChatViewModel {
    me: UserId,
    conversation: ConversationState,
    messages: Vec<Message>,
    online: OnlineUsers,
    connection: ConnectionState,
    status_message: Option<String>,
}

impl ChatViewModel {
    /// View model for the signed-in user `me`.
    pub fn new(me: UserId) -> Self {
        Self {
            me,
            conversation: ConversationState::NoConversation,
            messages: Vec::new(),
            online: OnlineUsers::new(),
            connection: ConnectionState::Disconnected,
            status_message: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: ChatEvent) -> Vec<ChatAction> {
        match event {
            ChatEvent::ConnectionChanged(state) => {
                if self.connection == state {
                    return vec![];
                }
                self.connection = state;
                vec![ChatAction::Render]
            },
            ChatEvent::FrameReceived(frame) => self.handle_frame(&frame),
            ChatEvent::HistoryLoaded { conversation, messages } => {
                if !self.is_loading(conversation) {
                    tracing::debug!(%conversation, "ignoring stale history");
                    return vec![];
                }
                let history = messages
                    .iter()
                    .map(|m| Message::from_history(m, conversation, self.me))
                    .collect();
                self.activate(conversation, history);
                vec![ChatAction::Render]
            },
            ChatEvent::HistoryFailed { conversation, error } => {
                if !self.is_loading(conversation) {
                    tracing::debug!(%conversation, %error, "ignoring stale history failure");
                    return vec![];
                }
                if error.is_forbidden() {
                    // No prior conversation with this peer: start fresh.
                    self.activate(conversation, Vec::new());
                } else {
                    tracing::warn!(%conversation, %error, "history fetch failed");
                    self.status_message = Some(format!("Could not load messages: {error}"));
                    self.conversation = ConversationState::Loading { conversation, error: Some(error) };
                }
                vec![ChatAction::Render]
            },
            ChatEvent::OnlineUsersLoaded(users) => {
                self.online.extend(users);
                vec![ChatAction::Render]
            },
            ChatEvent::UserConnected(user) => {
                if self.online.insert(user) { vec![ChatAction::Render] } else { vec![] }
            },
            ChatEvent::UserDisconnected(user) => {
                if self.online.remove(user) { vec![ChatAction::Render] } else { vec![] }
            },
            ChatEvent::SendFailed { client_id, reason } => {
                tracing::warn!(%client_id, %reason, "message not sent");
                let message = if self.connection == ConnectionState::Connected {
                    format!("Message not sent: {reason}")
                } else {
                    "You are offline. The message was not sent.".to_string()
                };
                self.status_message = Some(message.clone());
                vec![ChatAction::Alert { message }, ChatAction::Render]
            },
        }
    }

    /// Select a conversation and request its history.
    pub fn select(&mut self, conversation: Conversation) -> Vec<ChatAction> {
        self.conversation = ConversationState::Loading { conversation, error: None };
        self.messages.retain(|m| m.broadcast);
        self.status_message = None;
        vec![ChatAction::FetchHistory { conversation }, ChatAction::Render]
    }

    /// Retry the history fetch after a failure.
    pub fn retry(&mut self) -> Vec<ChatAction> {
        match self.conversation.selected() {
            Some(conversation) if self.conversation.active().is_none() => {
                self.conversation = ConversationState::Loading { conversation, error: None };
                vec![ChatAction::FetchHistory { conversation }, ChatAction::Render]
            },
            _ => vec![],
        }
    }

    /// Compose a message in the active conversation.
    ///
    /// Appends an optimistic message tagged with `client_id` and asks for it
    /// to be sent. Empty content is ignored; sending is refused until history
    /// has loaded.
    pub fn compose(
        &mut self,
        content: &str,
        now: Timestamp,
        client_id: CorrelationId,
    ) -> Vec<ChatAction> {
        if content.trim().is_empty() {
            return vec![];
        }
        let Some(conversation) = self.conversation.active() else {
            let message = match self.conversation.selected() {
                Some(_) => "Messages are still loading.".to_string(),
                None => "Select a conversation first.".to_string(),
            };
            return vec![ChatAction::Alert { message }];
        };

        self.messages.push(Message::optimistic(self.me, conversation, content, now, client_id.clone()));
        let message = OutgoingMessage::to_conversation(conversation, content).with_client_id(client_id);
        vec![ChatAction::SendFrame { message }, ChatAction::Render]
    }

    /// Signed-in user.
    pub fn me(&self) -> UserId {
        self.me
    }

    /// Selection lifecycle.
    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    /// Conversation that accepts sends.
    pub fn active_conversation(&self) -> Option<Conversation> {
        self.conversation.active()
    }

    /// Whether `compose` would send.
    pub fn can_send(&self) -> bool {
        self.conversation.active().is_some()
    }

    /// Messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Optimistic messages not yet confirmed.
    pub fn pending(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.optimistic)
    }

    /// Users known to be online.
    pub fn online_users(&self) -> &OnlineUsers {
        &self.online
    }

    /// Last known connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// Transient status message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    fn is_loading(&self, conversation: Conversation) -> bool {
        matches!(
            &self.conversation,
            ConversationState::Loading { conversation: selected, .. } if *selected == conversation
        )
    }

    fn activate(&mut self, conversation: Conversation, history: Vec<Message>) {
        // Keep what arrived while loading unless history already has it.
        let live = std::mem::replace(&mut self.messages, history);
        for message in live {
            if !self.messages.contains(&message) {
                self.messages.push(message);
            }
        }
        self.conversation = ConversationState::Active { conversation };
        self.status_message = None;
    }

    fn handle_frame(&mut self, frame: &Frame) -> Vec<ChatAction> {
        match frame {
            Frame::Private(msg) => self.handle_private(msg),
            Frame::Group(msg) => self.handle_group(msg),
            Frame::Broadcast(msg) => {
                self.messages.push(Message::from(msg));
                vec![ChatAction::Render]
            },
            Frame::ConnectionStatus(status) => self.handle(ChatEvent::ConnectionChanged(status.status)),
            Frame::Notification(_) => vec![],
        }
    }

    fn handle_private(&mut self, msg: &PrivateMessage) -> Vec<ChatAction> {
        let Some(Conversation::Private(peer)) = self.conversation.selected() else {
            return vec![];
        };
        let me = self.me;
        let relevant = (msg.from == me && msg.to == peer) || (msg.from == peer && msg.to == me);
        if !relevant {
            return vec![];
        }

        self.reconcile(msg.from, &msg.content, msg.timestamp, msg.client_id.as_ref());
        self.messages.push(Message::from(msg));
        vec![ChatAction::Render]
    }

    fn handle_group(&mut self, msg: &GroupMessage) -> Vec<ChatAction> {
        if self.conversation.selected() != Some(Conversation::Group(msg.group_id)) {
            return vec![];
        }

        self.reconcile(msg.from, &msg.content, msg.timestamp, msg.client_id.as_ref());
        self.messages.push(Message::from(msg));
        vec![ChatAction::Render]
    }

    /// Remove the optimistic message confirmed by an echo, if any.
    fn reconcile(
        &mut self,
        from: UserId,
        content: &str,
        timestamp: Timestamp,
        client_id: Option<&CorrelationId>,
    ) -> bool {
        let position = match client_id {
            Some(id) => {
                self.messages.iter().position(|m| m.optimistic && m.client_id.as_ref() == Some(id))
            },
            None => self.messages.iter().position(|m| {
                m.optimistic
                    && m.from == Some(from)
                    && m.content == content
                    && m.timestamp.abs_diff(timestamp) < RECONCILE_WINDOW
            }),
        };

        match position {
            Some(index) => {
                self.messages.remove(index);
                true
            },
            None => false,
        }
    }
}
