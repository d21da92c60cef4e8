//! Kith wire protocol
//!
//! JSON frames exchanged with the real-time server over a single WebSocket
//! connection. Every frame is an object carrying a `type` discriminator, a set
//! of kind-specific fields and a `timestamp`.
//!
//! # Components
//!
//! - [`Frame`]: inbound frame, one variant per [`FrameKind`]
//! - [`OutgoingMessage`]: outbound chat frame written by the client
//! - [`Notification`]: `notification` frame body, keyed by [`NotificationKind`]
//! - [`Timestamp`]: unix time, seconds on the wire and milliseconds in memory

#![forbid(unsafe_code)]

pub mod errors;
mod frame;
pub mod payloads;
mod timestamp;

pub use errors::{ProtocolError, Result};
pub use frame::{Frame, FrameKind};
pub use payloads::{
    chat::{
        BroadcastMessage, Conversation, CorrelationId, GroupId, GroupMessage, OutgoingMessage,
        PrivateMessage, UserId,
    },
    notification::{Notification, NotificationKind},
    status::{ConnectionState, ConnectionStatus},
};
pub use timestamp::Timestamp;
