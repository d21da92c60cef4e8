//! Observable chat state.
//!
//! The view-level data the chat UI renders: the message list of the selected
//! conversation, where that conversation is in its selection lifecycle, and
//! who is online.

use std::collections::BTreeSet;

use kith_client::{ApiError, HistoryMessage};
use kith_proto::{
    BroadcastMessage, Conversation, CorrelationId, GroupId, GroupMessage, PrivateMessage,
    Timestamp, UserId,
};

/// Where a message was addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Direct message to this user.
    Private(UserId),
    /// Message posted to this group.
    Group(GroupId),
    /// Message for everyone.
    Broadcast,
}

/// A message in the chat view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Sender. `None` for system broadcasts.
    pub from: Option<UserId>,
    /// Addressee.
    pub target: Target,
    /// Message body.
    pub content: String,
    /// Send time (local for optimistic messages, server otherwise).
    pub timestamp: Timestamp,
    /// Correlation ID, when known.
    pub client_id: Option<CorrelationId>,
    /// Shown before the server confirmed it.
    pub optimistic: bool,
    /// Arrived as a broadcast.
    pub broadcast: bool,
}

impl Message {
    /// Locally composed message awaiting its echo.
    pub fn optimistic(
        from: UserId,
        conversation: Conversation,
        content: impl Into<String>,
        timestamp: Timestamp,
        client_id: CorrelationId,
    ) -> Self {
        let target = match conversation {
            Conversation::Private(peer) => Target::Private(peer),
            Conversation::Group(group) => Target::Group(group),
        };
        Self {
            from: Some(from),
            target,
            content: content.into(),
            timestamp,
            client_id: Some(client_id),
            optimistic: true,
            broadcast: false,
        }
    }

    /// Whether this message was addressed within `conversation` as seen by `me`.
    pub fn belongs_to(&self, conversation: Conversation, me: UserId) -> bool {
        match (self.target, conversation) {
            (Target::Private(to), Conversation::Private(peer)) => {
                let from = self.from;
                (from == Some(me) && to == peer) || (from == Some(peer) && to == me)
            },
            (Target::Group(group), Conversation::Group(selected)) => group == selected,
            _ => false,
        }
    }
}

impl From<&PrivateMessage> for Message {
    fn from(msg: &PrivateMessage) -> Self {
        Self {
            from: Some(msg.from),
            target: Target::Private(msg.to),
            content: msg.content.clone(),
            timestamp: msg.timestamp,
            client_id: msg.client_id.clone(),
            optimistic: false,
            broadcast: false,
        }
    }
}

impl From<&GroupMessage> for Message {
    fn from(msg: &GroupMessage) -> Self {
        Self {
            from: Some(msg.from),
            target: Target::Group(msg.group_id),
            content: msg.content.clone(),
            timestamp: msg.timestamp,
            client_id: msg.client_id.clone(),
            optimistic: false,
            broadcast: false,
        }
    }
}

impl From<&BroadcastMessage> for Message {
    fn from(msg: &BroadcastMessage) -> Self {
        Self {
            from: msg.from,
            target: Target::Broadcast,
            content: msg.content.clone(),
            timestamp: msg.timestamp,
            client_id: None,
            optimistic: false,
            broadcast: true,
        }
    }
}

impl Message {
    /// Message from a history response for `conversation`.
    ///
    /// History rows may omit the addressee; it is filled in from the
    /// conversation.
    pub fn from_history(msg: &HistoryMessage, conversation: Conversation, me: UserId) -> Self {
        let target = match conversation {
            Conversation::Private(peer) => {
                let to = msg.to.unwrap_or(if msg.from == me { peer } else { me });
                Target::Private(to)
            },
            Conversation::Group(group) => Target::Group(msg.group_id.unwrap_or(group)),
        };
        Self {
            from: Some(msg.from),
            target,
            content: msg.content.clone(),
            timestamp: msg.timestamp,
            client_id: None,
            optimistic: false,
            broadcast: false,
        }
    }
}

/// Conversation selection lifecycle.
///
/// ```text
/// NoConversation ──select──> Loading ──history ok / 403──> Active
///                               │ ↑
///                               └─┘ other failure (error surfaced)
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConversationState {
    /// Nothing selected.
    #[default]
    NoConversation,
    /// History requested. `error` is set if the last fetch failed.
    Loading {
        /// Selected conversation.
        conversation: Conversation,
        /// Failure of the last fetch, if any.
        error: Option<ApiError>,
    },
    /// History loaded; sending allowed.
    Active {
        /// Selected conversation.
        conversation: Conversation,
    },
}

impl ConversationState {
    /// Selected conversation, loaded or not.
    pub fn selected(&self) -> Option<Conversation> {
        match self {
            Self::NoConversation => None,
            Self::Loading { conversation, .. } | Self::Active { conversation } => {
                Some(*conversation)
            },
        }
    }

    /// Conversation that accepts sends.
    pub fn active(&self) -> Option<Conversation> {
        match self {
            Self::Active { conversation } => Some(*conversation),
            _ => None,
        }
    }
}

/// Users currently online.
///
/// Seeded from the REST snapshot and maintained from presence notifications.
/// There is no expiry, so a missed disconnect leaves a stale entry until the
/// next snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnlineUsers(BTreeSet<UserId>);

impl OnlineUsers {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user. Returns `false` if already present.
    pub fn insert(&mut self, user: UserId) -> bool {
        self.0.insert(user)
    }

    /// Remove a user. Returns `false` if absent.
    pub fn remove(&mut self, user: UserId) -> bool {
        self.0.remove(&user)
    }

    /// Merge a snapshot.
    pub fn extend(&mut self, users: impl IntoIterator<Item = UserId>) {
        self.0.extend(users);
    }

    /// Whether `user` is online.
    pub fn contains(&self, user: UserId) -> bool {
        self.0.contains(&user)
    }

    /// Number of online users.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nobody is known to be online.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Online users in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = UserId> + '_ {
        self.0.iter().copied()
    }
}
