//! Inputs to the chat view model.
//!
//! Events come from three places:
//! - Frames and status changes from the connection manager.
//! - Completed REST calls (history, online users).
//! - Presence notifications routed by the notification dispatcher.

use kith_client::{ApiError, HistoryMessage};
use kith_proto::{ConnectionState, Conversation, CorrelationId, Frame, UserId};

/// Events processed by the chat view model.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// Connection status changed.
    ConnectionChanged(ConnectionState),

    /// A frame arrived from the server.
    FrameReceived(Frame),

    /// History fetch succeeded.
    HistoryLoaded {
        /// Conversation the history belongs to.
        conversation: Conversation,
        /// Messages, oldest first.
        messages: Vec<HistoryMessage>,
    },

    /// History fetch failed.
    HistoryFailed {
        /// Conversation the request was for.
        conversation: Conversation,
        /// What went wrong.
        error: ApiError,
    },

    /// Online-user snapshot arrived.
    OnlineUsersLoaded(Vec<UserId>),

    /// A user came online.
    UserConnected(UserId),

    /// A user went offline.
    UserDisconnected(UserId),

    /// The connection refused an outbound message.
    SendFailed {
        /// Correlation ID of the optimistic message.
        client_id: CorrelationId,
        /// Why the send failed.
        reason: String,
    },
}
