//! Standard invariant checks.
//!
//! These capture properties of the chat view that must hold after any
//! sequence of events.

use std::collections::HashSet;

use super::{Invariant, InvariantKind, InvariantResult, ViewSnapshot, Violation};

/// Every non-broadcast message belongs to the selected conversation.
///
/// A private message is shown only if its sender and recipient are exactly
/// the signed-in user and the selected peer; a group message only if it was
/// posted to the selected group.
pub struct ActiveConversationHasNoForeignMessages;

impl Invariant for ActiveConversationHasNoForeignMessages {
    fn kind(&self) -> InvariantKind {
        InvariantKind::ActiveConversationHasNoForeignMessages
    }

    fn check(&self, state: &ViewSnapshot) -> InvariantResult {
        for message in state.messages.iter().filter(|m| !m.broadcast) {
            let Some(conversation) = state.selected else {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!("message {message:?} shown with no conversation selected"),
                });
            };
            if !message.belongs_to(conversation, state.me) {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!("message {message:?} does not belong to {conversation}"),
                });
            }
        }
        Ok(())
    }
}

/// An echo never coexists with the optimistic message it confirms.
///
/// No optimistic message shares its correlation ID with a confirmed message,
/// and no two optimistic messages share a correlation ID.
pub struct NoDuplicateEcho;

impl Invariant for NoDuplicateEcho {
    fn kind(&self) -> InvariantKind {
        InvariantKind::NoDuplicateEcho
    }

    fn check(&self, state: &ViewSnapshot) -> InvariantResult {
        let confirmed: HashSet<_> = state
            .messages
            .iter()
            .filter(|m| !m.optimistic)
            .filter_map(|m| m.client_id.as_ref())
            .collect();

        let mut pending = HashSet::new();
        for message in state.messages.iter().filter(|m| m.optimistic) {
            let Some(id) = message.client_id.as_ref() else { continue };
            if confirmed.contains(id) {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!("optimistic message {id} shown next to its echo"),
                });
            }
            if !pending.insert(id) {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!("correlation id {id} used twice"),
                });
            }
        }
        Ok(())
    }
}

/// Optimistic messages exist only while a conversation is active.
///
/// Sending is refused until history has loaded, and switching conversations
/// discards the previous conversation's pending messages.
pub struct OptimisticOnlyWhenActive;

impl Invariant for OptimisticOnlyWhenActive {
    fn kind(&self) -> InvariantKind {
        InvariantKind::OptimisticOnlyWhenActive
    }

    fn check(&self, state: &ViewSnapshot) -> InvariantResult {
        if state.active {
            return Ok(());
        }
        match state.messages.iter().find(|m| m.optimistic) {
            Some(message) => Err(Violation {
                invariant: self.kind(),
                message: format!("optimistic message {message:?} while not active"),
            }),
            None => Ok(()),
        }
    }
}
