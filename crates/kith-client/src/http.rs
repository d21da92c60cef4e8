//! REST client over `reqwest`.

use kith_core::SessionCredential;
use kith_proto::{Conversation, UserId};
use reqwest::{Client, RequestBuilder, Response, header::COOKIE};
use serde::Deserialize;
use url::Url;

use crate::{
    api::{
        self, ChatApi, HistoryMessage, NOTIFICATIONS_READ_PATH, ONLINE_USERS_PATH, history_path,
    },
    error::ApiError,
};

/// Online-user payload. Older backends return a bare list.
#[derive(Deserialize)]
#[serde(untagged)]
enum OnlineUsersBody {
    Ids(Vec<UserId>),
    Wrapped { online_users: Vec<UserId> },
}

/// [`ChatApi`] backed by HTTP requests to the API origin.
///
/// Every request carries the session cookie when one is configured.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
    session: Option<SessionCredential>,
}

impl HttpApi {
    /// Client for the API at `base_url`.
    pub fn new(base_url: Url, session: Option<SessionCredential>) -> Self {
        Self { client: Client::new(), base_url, session }
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        api::endpoint(&self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.session {
            Some(session) => request.header(COOKIE, session.cookie_header()),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { status: status.as_u16() });
        }
        Ok(response)
    }
}

impl ChatApi for HttpApi {
    async fn online_users(&self) -> Result<Vec<UserId>, ApiError> {
        let url = self.url(ONLINE_USERS_PATH)?;
        let body: OnlineUsersBody = self
            .execute(self.client.get(url))
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        Ok(match body {
            OnlineUsersBody::Ids(ids) | OnlineUsersBody::Wrapped { online_users: ids } => ids,
        })
    }

    async fn chat_history(&self, conversation: Conversation) -> Result<Vec<HistoryMessage>, ApiError> {
        let url = self.url(&history_path(conversation))?;
        self.execute(self.client.get(url))
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn mark_notifications_read(&self) -> Result<(), ApiError> {
        let url = self.url(NOTIFICATIONS_READ_PATH)?;
        self.execute(self.client.post(url)).await?;
        Ok(())
    }
}
