//! Client configuration.

use kith_core::{
    ConnectionConfig, ConnectionError, ReconnectPolicy, SessionCredential, endpoint,
};
use url::Url;

/// Configuration for a [`crate::ConnectionManager`] and the REST client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Origin of the REST API, e.g. `https://social.example`.
    pub base_url: Url,
    /// Session credential for the real-time endpoint and REST calls.
    pub session: Option<SessionCredential>,
    /// Reconnect backoff and attempt budget.
    pub reconnect: ReconnectPolicy,
    /// Reconnect after abnormal closures.
    pub auto_reconnect: bool,
}

impl ClientConfig {
    /// Configuration with default reconnect behavior and no session.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            session: None,
            reconnect: ReconnectPolicy::default(),
            auto_reconnect: true,
        }
    }

    /// Attach a session credential.
    #[must_use]
    pub fn with_session(mut self, session: SessionCredential) -> Self {
        self.session = Some(session);
        self
    }

    /// Enable or disable automatic reconnection.
    #[must_use]
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Override the reconnect policy.
    #[must_use]
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Real-time endpoint derived from `base_url` and `session`.
    pub fn websocket_url(&self) -> Result<Url, ConnectionError> {
        endpoint::websocket_url(&self.base_url, self.session.as_ref())
    }

    /// State machine configuration.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig { policy: self.reconnect, auto_reconnect: self.auto_reconnect }
    }
}
