//! Activity feed for social notifications.
//!
//! Collects `follow_request` and `follow` notifications, newest first, with
//! an unread counter cleared by marking the feed read.

use kith_proto::{Notification, NotificationKind, Timestamp, UserId};

/// One entry in the activity feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// Notification subtype.
    pub kind: NotificationKind,
    /// User who triggered it.
    pub from: Option<UserId>,
    /// Display name, when the server sent one.
    pub username: Option<String>,
    /// Server-provided text.
    pub message: Option<String>,
    /// Server timestamp.
    pub timestamp: Timestamp,
    /// Seen by the user.
    pub read: bool,
}

impl FeedItem {
    /// One-line description.
    pub fn summary(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        let who = match (&self.username, self.from) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => format!("user {id}"),
            (None, None) => "someone".to_string(),
        };
        match self.kind {
            NotificationKind::FollowRequest => format!("{who} wants to follow you"),
            NotificationKind::Follow => format!("{who} followed you"),
            _ => format!("{who}: {}", self.kind),
        }
    }
}

/// Activity feed.
#[derive(Debug, Clone, Default)]
pub struct NotificationFeed {
    items: Vec<FeedItem>,
}

impl NotificationFeed {
    /// Empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether notifications of `kind` belong in the feed.
    pub fn accepts(kind: &NotificationKind) -> bool {
        matches!(kind, NotificationKind::FollowRequest | NotificationKind::Follow)
    }

    /// Add a notification. Returns `false` if it does not belong in the feed.
    pub fn push(&mut self, notification: &Notification) -> bool {
        if !Self::accepts(&notification.subtype) {
            return false;
        }
        self.items.insert(0, FeedItem {
            kind: notification.subtype.clone(),
            from: notification.subject(),
            username: notification.username.clone(),
            message: notification.message.clone(),
            timestamp: notification.timestamp,
            read: false,
        });
        true
    }

    /// Entries, newest first.
    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    /// Entries not yet read.
    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|item| !item.read).count()
    }

    /// Mark every entry read.
    pub fn mark_all_read(&mut self) {
        for item in &mut self.items {
            item.read = true;
        }
    }
}
