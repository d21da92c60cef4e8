//! Frame type and kind discriminator.
//!
//! A [`Frame`] is one JSON text message on the real-time channel. The `type`
//! field selects the variant; the remaining fields belong to the variant's
//! payload.
//!
//! # Invariants
//!
//! - Closed set: `type` MUST be one of the [`FrameKind`] names. Anything else
//!   is rejected by [`Frame::decode`] rather than silently mapped.
//! - Decoding never panics. Every malformed input surfaces as
//!   [`ProtocolError::Malformed`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    BroadcastMessage, ConnectionStatus, GroupMessage, Notification, PrivateMessage,
    errors::{ProtocolError, Result},
};

/// Frame kind, used as the subscription key on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    /// One-to-one chat message.
    Private,
    /// Group chat message.
    Group,
    /// Message for every connected user.
    Broadcast,
    /// Server notification, narrowed further by subtype.
    Notification,
    /// Local connection lifecycle transition.
    ConnectionStatus,
}

impl FrameKind {
    /// All kinds, in wire order.
    pub const ALL: [Self; 5] =
        [Self::Private, Self::Group, Self::Broadcast, Self::Notification, Self::ConnectionStatus];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
            Self::Broadcast => "broadcast",
            Self::Notification => "notification",
            Self::ConnectionStatus => "connection_status",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// One-to-one chat message.
    Private(PrivateMessage),
    /// Group chat message.
    Group(GroupMessage),
    /// Message for every connected user.
    Broadcast(BroadcastMessage),
    /// Server notification.
    Notification(Notification),
    /// Local connection lifecycle transition.
    ConnectionStatus(ConnectionStatus),
}

impl Frame {
    /// Decode a frame from JSON text.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ProtocolError::malformed(&e))
    }

    /// Encode the frame as JSON text.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Discriminator of this frame.
    #[must_use]
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Private(_) => FrameKind::Private,
            Self::Group(_) => FrameKind::Group,
            Self::Broadcast(_) => FrameKind::Broadcast,
            Self::Notification(_) => FrameKind::Notification,
            Self::ConnectionStatus(_) => FrameKind::ConnectionStatus,
        }
    }
}
