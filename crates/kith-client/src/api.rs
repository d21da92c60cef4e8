//! REST collaborators.
//!
//! The messaging core depends on three backend endpoints: the online-user
//! snapshot, chat history, and marking notifications read. Everything else
//! the backend offers is out of scope.
//!
//! Paths are relative so an API mounted under a prefix (`https://host/chat/`)
//! keeps that prefix.

use std::future::Future;

use kith_proto::{Conversation, GroupId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ApiError;

/// A message as returned by the history endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// Sender.
    pub from: UserId,
    /// Recipient, for private history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<UserId>,
    /// Group, for group history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    /// Message body.
    pub content: String,
    /// Server timestamp.
    #[serde(default)]
    pub timestamp: Timestamp,
}

/// Backend endpoints consumed by the messaging core.
pub trait ChatApi: Send + Sync + 'static {
    /// `GET /api/online-users`.
    fn online_users(&self) -> impl Future<Output = Result<Vec<UserId>, ApiError>> + Send;

    /// `GET /api/messages/private/{peer}` or `GET /api/messages/group/{group}`.
    fn chat_history(
        &self,
        conversation: Conversation,
    ) -> impl Future<Output = Result<Vec<HistoryMessage>, ApiError>> + Send;

    /// `POST /api/notifications/read`.
    fn mark_notifications_read(&self) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Online-user snapshot.
pub const ONLINE_USERS_PATH: &str = "api/online-users";

/// Mark every notification read.
pub const NOTIFICATIONS_READ_PATH: &str = "api/notifications/read";

/// Path of the history endpoint for `conversation`.
pub fn history_path(conversation: Conversation) -> String {
    match conversation {
        Conversation::Private(peer) => format!("api/messages/private/{peer}"),
        Conversation::Group(group) => format!("api/messages/group/{group}"),
    }
}

/// Resolve `path` under `base`, treating `base` as a directory.
///
/// `https://host/chat` and `https://host/chat/` both resolve
/// `api/online-users` to `https://host/chat/api/online-users`.
pub fn endpoint(base: &Url, path: &str) -> Result<Url, ApiError> {
    let mut root = base.clone();
    if !root.path().ends_with('/') {
        let dir = format!("{}/", root.path());
        root.set_path(&dir);
    }
    root.join(path).map_err(|e| ApiError::Transport(format!("bad path {path}: {e}")))
}
