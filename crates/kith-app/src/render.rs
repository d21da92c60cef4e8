//! Plain-text rendering with a fallback.
//!
//! [`render_or_fallback`] runs a renderer and, if it fails, produces a
//! fallback view instead. The failure is returned alongside so callers can
//! log it; nothing unwinds.

use std::fmt;

use chrono::{DateTime, Utc};
use kith_proto::{ConnectionState, Timestamp, UserId};
use thiserror::Error;

use crate::{
    ChatViewModel,
    state::{ConversationState, Message, Target},
};

/// A renderer could not produce its view.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("render failed: {reason}")]
pub struct RenderError {
    reason: String,
}

impl RenderError {
    /// Error with a description.
    pub fn new(reason: impl fmt::Display) -> Self {
        Self { reason: reason.to_string() }
    }

    /// Description of the failure.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Outcome of [`render_or_fallback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<V> {
    /// The primary renderer succeeded.
    Primary(V),
    /// The primary renderer failed; this is the fallback view.
    Fallback {
        /// Fallback view.
        view: V,
        /// Why the primary renderer failed.
        error: RenderError,
    },
}

impl<V> Rendered<V> {
    /// The view to show.
    pub fn view(&self) -> &V {
        match self {
            Self::Primary(view) | Self::Fallback { view, .. } => view,
        }
    }

    /// Consume into the view to show.
    pub fn into_view(self) -> V {
        match self {
            Self::Primary(view) | Self::Fallback { view, .. } => view,
        }
    }

    /// The primary renderer's failure, if any.
    pub fn error(&self) -> Option<&RenderError> {
        match self {
            Self::Primary(_) => None,
            Self::Fallback { error, .. } => Some(error),
        }
    }
}

/// Run `primary`; on failure, build the view with `fallback`.
pub fn render_or_fallback<V>(
    primary: impl FnOnce() -> Result<V, RenderError>,
    fallback: impl FnOnce(&RenderError) -> V,
) -> Rendered<V> {
    match primary() {
        Ok(view) => Rendered::Primary(view),
        Err(error) => {
            tracing::warn!(%error, "rendering fallback");
            let view = fallback(&error);
            Rendered::Fallback { view, error }
        },
    }
}

/// Render one message as a line of text.
///
/// Fails on content that would corrupt a terminal (control characters other
/// than tab and newline).
pub fn render_message(message: &Message, me: UserId) -> Result<String, RenderError> {
    if let Some(c) = message.content.chars().find(|c| c.is_control() && *c != '\n' && *c != '\t') {
        return Err(RenderError::new(format!("unprintable character {c:?} in message")));
    }

    let sender = match message.from {
        Some(id) if id == me => "you".to_string(),
        Some(id) => format!("@{id}"),
        None => "system".to_string(),
    };
    let mut line = format!("[{}] ", clock(message.timestamp));
    if message.broadcast || message.target == Target::Broadcast {
        line.push_str("(broadcast) ");
    }
    line.push_str(&sender);
    line.push_str(": ");
    line.push_str(&message.content);
    if message.optimistic {
        line.push_str(" (sending)");
    }
    Ok(line)
}

/// Render the whole chat view as lines of text.
///
/// A message that fails to render is replaced by a placeholder line.
pub fn render_view(view: &ChatViewModel) -> Vec<String> {
    let mut lines = vec![header(view)];

    for message in view.messages() {
        let rendered = render_or_fallback(
            || render_message(message, view.me()),
            |_| format!("[{}] (message could not be displayed)", clock(message.timestamp)),
        );
        lines.push(rendered.into_view());
    }

    if let Some(status) = view.status_message() {
        lines.push(format!("! {status}"));
    }
    lines
}

fn header(view: &ChatViewModel) -> String {
    let connection = match view.connection_state() {
        ConnectionState::Connected => "online",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Disconnected => "offline",
    };
    let conversation = match view.conversation() {
        ConversationState::NoConversation => "no conversation".to_string(),
        ConversationState::Loading { conversation, error: None } => format!("{conversation} (loading)"),
        ConversationState::Loading { conversation, error: Some(_) } => format!("{conversation} (unavailable)"),
        ConversationState::Active { conversation } => conversation.to_string(),
    };
    format!("== {conversation} | {connection} | {} online ==", view.online_users().len())
}

/// Shown for timestamps outside the representable calendar.
const UNKNOWN_TIME: &str = "--:--:--";

/// `HH:MM:SS` in UTC.
fn clock(timestamp: Timestamp) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp.as_millis())
        .map_or_else(|| UNKNOWN_TIME.to_owned(), |at| at.format("%H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use kith_proto::{Conversation, CorrelationId};

    use super::*;

    fn message(content: &str) -> Message {
        Message::optimistic(
            7,
            Conversation::Private(9),
            content,
            Timestamp::from_millis(3_723_000),
            CorrelationId::from_u64(1),
        )
    }

    #[test]
    fn renders_optimistic_marker() {
        let line = render_message(&message("hi"), 7).unwrap();
        assert_eq!(line, "[01:02:03] you: hi (sending)");
    }

    #[test]
    fn clock_handles_dates_before_epoch() {
        assert_eq!(clock(Timestamp::from_millis(-1_000)), "23:59:59");
    }

    #[test]
    fn clock_falls_back_outside_calendar() {
        assert_eq!(clock(Timestamp::from_millis(i64::MAX)), UNKNOWN_TIME);
        assert_eq!(clock(Timestamp::from_millis(i64::MIN)), UNKNOWN_TIME);
    }

    #[test]
    fn control_characters_fail() {
        let err = render_message(&message("bad\u{1b}[2J"), 7).unwrap_err();
        assert!(err.reason().contains("unprintable"));
    }

    #[test]
    fn fallback_carries_error() {
        let rendered = render_or_fallback(|| Err::<String, _>(RenderError::new("boom")), |e| {
            format!("fallback: {}", e.reason())
        });
        assert_eq!(rendered.view(), "fallback: boom");
        assert_eq!(rendered.error().map(RenderError::reason), Some("boom"));
    }

    #[test]
    fn primary_passes_through() {
        let rendered = render_or_fallback(|| Ok::<_, RenderError>(1), |_| 0);
        assert_eq!(rendered, Rendered::Primary(1));
        assert!(rendered.error().is_none());
    }

    #[test]
    fn view_replaces_unrenderable_messages() {
        let mut view = ChatViewModel::new(7);
        view.handle(crate::ChatEvent::FrameReceived(kith_proto::Frame::Broadcast(
            kith_proto::BroadcastMessage {
                from: None,
                content: "\u{7}ding".into(),
                timestamp: Timestamp::from_millis(0),
            },
        )));

        let lines = render_view(&view);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("== no conversation | offline"));
        assert_eq!(lines[1], "[00:00:00] (message could not be displayed)");
    }
}
