//! Application layer for Kith
//!
//! Pure view state for the chat UI and the session that wires it to the
//! connection. The view model is a state machine like the ones in
//! [`kith_core`]: events in, actions out, no I/O.
//!
//! # Components
//!
//! - [`ChatViewModel`]: conversation selection, message list, optimistic
//!   reconciliation, online users
//! - [`NotificationFeed`]: follow and follow-request activity
//! - [`Session`]: owns the manager, dispatcher, views and subscriptions
//! - [`render`]: plain-text rendering with [`render::render_or_fallback`]

#![forbid(unsafe_code)]

mod action;
mod chat;
mod event;
mod feed;
pub mod render;
mod session;
mod state;

pub use action::ChatAction;
pub use chat::{ChatViewModel, RECONCILE_WINDOW};
pub use event::ChatEvent;
pub use feed::{FeedItem, NotificationFeed};
pub use render::{RenderError, Rendered, render_or_fallback};
pub use session::{Session, SessionError};
pub use state::{ConversationState, Message, OnlineUsers, Target};
