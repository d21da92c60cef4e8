//! Notification payloads.
//!
//! A `notification` frame narrows to a subtype. The known subtypes get their
//! own variant; anything else is preserved verbatim in
//! [`NotificationKind::Other`] so new server subtypes decode without a client
//! release.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Timestamp, UserId};

/// Notification subtype.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    /// A user came online.
    UserConnected,
    /// A user went offline.
    UserDisconnected,
    /// Someone asked to follow the current user.
    FollowRequest,
    /// Someone followed the current user.
    Follow,
    /// Subtype this client does not know about.
    Other(String),
}

impl NotificationKind {
    /// Wire name of the subtype.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::UserConnected => "user_connected",
            Self::UserDisconnected => "user_disconnected",
            Self::FollowRequest => "follow_request",
            Self::Follow => "follow",
            Self::Other(name) => name,
        }
    }

    /// Whether this is one of the subtypes the client recognizes.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for NotificationKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "user_connected" => Self::UserConnected,
            "user_disconnected" => Self::UserDisconnected,
            "follow_request" => Self::FollowRequest,
            "follow" => Self::Follow,
            _ => Self::Other(value),
        }
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::Other(name) => name,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a `notification` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Subtype discriminator.
    pub subtype: NotificationKind,
    /// Server timestamp.
    #[serde(default)]
    pub timestamp: Timestamp,
    /// User the notification is about (presence changes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// User that triggered the notification (follows).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<UserId>,
    /// Display name of the subject, when the server includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Human-readable text, when the server includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Notification {
    /// Notification of `subtype` with no optional fields.
    #[must_use]
    pub fn new(subtype: NotificationKind, timestamp: Timestamp) -> Self {
        Self { subtype, timestamp, user_id: None, from: None, username: None, message: None }
    }

    /// Set the subject user.
    #[must_use]
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the triggering user.
    #[must_use]
    pub fn with_from(mut self, from: UserId) -> Self {
        self.from = Some(from);
        self
    }

    /// The user this notification concerns: `user_id`, falling back to `from`.
    #[must_use]
    pub fn subject(&self) -> Option<UserId> {
        self.user_id.or(self.from)
    }
}
