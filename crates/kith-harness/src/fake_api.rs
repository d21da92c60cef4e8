//! Scripted REST collaborator.

use std::{collections::HashMap, sync::Arc};

use kith_client::{ApiError, ChatApi, HistoryMessage};
use kith_proto::{Conversation, UserId};
use parking_lot::Mutex;

#[derive(Default)]
struct Script {
    online: Option<Result<Vec<UserId>, ApiError>>,
    history: HashMap<Conversation, Result<Vec<HistoryMessage>, ApiError>>,
    mark_read: Option<ApiError>,
    history_requests: Vec<Conversation>,
    mark_read_calls: usize,
}

/// [`ChatApi`] answering from a script.
///
/// Unscripted online-user requests return an empty list; unscripted history
/// requests return an empty history. Clones share the script.
#[derive(Clone, Default)]
pub struct FakeApi {
    script: Arc<Mutex<Script>>,
}

impl FakeApi {
    /// API with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer online-user requests with `users`.
    pub fn set_online_users(&self, users: Vec<UserId>) {
        self.script.lock().online = Some(Ok(users));
    }

    /// Fail online-user requests with `error`.
    pub fn fail_online_users(&self, error: ApiError) {
        self.script.lock().online = Some(Err(error));
    }

    /// Answer history requests for `conversation` with `messages`.
    pub fn set_history(&self, conversation: Conversation, messages: Vec<HistoryMessage>) {
        self.script.lock().history.insert(conversation, Ok(messages));
    }

    /// Fail history requests for `conversation` with `error`.
    pub fn fail_history(&self, conversation: Conversation, error: ApiError) {
        self.script.lock().history.insert(conversation, Err(error));
    }

    /// Fail mark-read requests with `error`.
    pub fn fail_mark_read(&self, error: ApiError) {
        self.script.lock().mark_read = Some(error);
    }

    /// Conversations whose history was requested, in order.
    pub fn history_requests(&self) -> Vec<Conversation> {
        self.script.lock().history_requests.clone()
    }

    /// Number of mark-read calls.
    pub fn mark_read_calls(&self) -> usize {
        self.script.lock().mark_read_calls
    }
}

impl ChatApi for FakeApi {
    async fn online_users(&self) -> Result<Vec<UserId>, ApiError> {
        self.script.lock().online.clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn chat_history(&self, conversation: Conversation) -> Result<Vec<HistoryMessage>, ApiError> {
        let mut script = self.script.lock();
        script.history_requests.push(conversation);
        script.history.get(&conversation).cloned().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn mark_notifications_read(&self) -> Result<(), ApiError> {
        let mut script = self.script.lock();
        script.mark_read_calls += 1;
        match &script.mark_read {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
