//! Side effects requested by the chat view model.
//!
//! [`ChatAction`]s are instructions produced by [`crate::ChatViewModel`] for
//! the session to execute.

use kith_proto::{Conversation, OutgoingMessage};

/// Actions produced by the chat view model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    /// State changed; redraw.
    Render,

    /// Load history for a conversation.
    FetchHistory {
        /// Conversation to load.
        conversation: Conversation,
    },

    /// Write a chat frame to the connection.
    SendFrame {
        /// Frame to send, carrying the optimistic message's correlation ID.
        message: OutgoingMessage,
    },

    /// Show a blocking alert to the user.
    Alert {
        /// Alert text.
        message: String,
    },
}
