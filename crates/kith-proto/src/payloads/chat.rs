//! Chat message payloads.
//!
//! Inbound messages are stamped by the server (`from`, `timestamp`). Outbound
//! messages carry only what the client knows; the server fills in the sender
//! and echoes the message back to both parties.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{FrameKind, Timestamp};

/// Stable user identifier assigned by the backend.
pub type UserId = u64;

/// Stable group identifier assigned by the backend.
pub type GroupId = u64;

/// Client-generated correlation identifier.
///
/// Attached to outbound messages and echoed unchanged by the server so an echo
/// can be matched to the optimistic message it confirms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Correlation ID rendered from 64 random bits.
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        Self(format!("{value:016x}"))
    }

    /// Correlation ID as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The conversation a chat view is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversation {
    /// One-to-one conversation with a peer.
    Private(UserId),
    /// Group conversation.
    Group(GroupId),
}

impl fmt::Display for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private(peer) => write!(f, "@{peer}"),
            Self::Group(group) => write!(f, "#{group}"),
        }
    }
}

/// Direct message between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateMessage {
    /// Sender.
    pub from: UserId,
    /// Recipient.
    pub to: UserId,
    /// Message body.
    pub content: String,
    /// Server timestamp.
    #[serde(default)]
    pub timestamp: Timestamp,
    /// Echoed correlation ID. `None` for servers that do not echo it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<CorrelationId>,
}

/// Message posted to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMessage {
    /// Sender.
    pub from: UserId,
    /// Target group.
    pub group_id: GroupId,
    /// Message body.
    pub content: String,
    /// Server timestamp.
    #[serde(default)]
    pub timestamp: Timestamp,
    /// Echoed correlation ID. `None` for servers that do not echo it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<CorrelationId>,
}

/// Message delivered to every connected user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    /// Sender, if the broadcast came from a user rather than the system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<UserId>,
    /// Message body.
    pub content: String,
    /// Server timestamp.
    #[serde(default)]
    pub timestamp: Timestamp,
}

/// Chat frame written by the client.
///
/// Wire shape: `{type, content, to?, group_id?, client_id?, timestamp}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Frame kind (`private`, `group` or `broadcast`).
    #[serde(rename = "type")]
    pub kind: FrameKind,
    /// Message body.
    pub content: String,
    /// Recipient for private messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<UserId>,
    /// Target group for group messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    /// Correlation ID the server echoes back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<CorrelationId>,
    /// Send time, stamped by the connection manager.
    #[serde(default)]
    pub timestamp: Timestamp,
}

impl OutgoingMessage {
    /// Outbound message addressed to `conversation`.
    #[must_use]
    pub fn to_conversation(conversation: Conversation, content: impl Into<String>) -> Self {
        match conversation {
            Conversation::Private(peer) => Self::private(peer, content),
            Conversation::Group(group) => Self::group(group, content),
        }
    }

    /// Outbound private message.
    #[must_use]
    pub fn private(to: UserId, content: impl Into<String>) -> Self {
        Self::new(FrameKind::Private, content, Some(to), None)
    }

    /// Outbound group message.
    #[must_use]
    pub fn group(group_id: GroupId, content: impl Into<String>) -> Self {
        Self::new(FrameKind::Group, content, None, Some(group_id))
    }

    /// Outbound broadcast.
    #[must_use]
    pub fn broadcast(content: impl Into<String>) -> Self {
        Self::new(FrameKind::Broadcast, content, None, None)
    }

    /// Outbound message with explicit fields.
    #[must_use]
    pub fn new(
        kind: FrameKind,
        content: impl Into<String>,
        to: Option<UserId>,
        group_id: Option<GroupId>,
    ) -> Self {
        Self {
            kind,
            content: content.into(),
            to,
            group_id,
            client_id: None,
            timestamp: Timestamp::default(),
        }
    }

    /// Attach a correlation ID.
    #[must_use]
    pub fn with_client_id(mut self, client_id: CorrelationId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Serialize to JSON text.
    pub fn encode(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| crate::ProtocolError::Encode(e.to_string()))
    }
}
