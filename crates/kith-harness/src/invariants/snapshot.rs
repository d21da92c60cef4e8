//! Observable view state for invariant checking.
//!
//! Invariants run against snapshots rather than live state so every check
//! sees one consistent moment.

use kith_app::{ChatViewModel, ConversationState, Message};
use kith_proto::{Conversation, UserId};

/// Snapshot of one chat view.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    /// Signed-in user.
    pub me: UserId,
    /// Selected conversation, loaded or not.
    pub selected: Option<Conversation>,
    /// Whether sending is allowed.
    pub active: bool,
    /// Message list, oldest first.
    pub messages: Vec<Message>,
}

impl ViewSnapshot {
    /// Capture `view`.
    pub fn from_view(view: &ChatViewModel) -> Self {
        Self {
            me: view.me(),
            selected: view.conversation().selected(),
            active: matches!(view.conversation(), ConversationState::Active { .. }),
            messages: view.messages().to_vec(),
        }
    }
}
