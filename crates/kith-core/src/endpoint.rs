//! WebSocket endpoint derivation.
//!
//! The real-time endpoint lives next to the REST API: same host, scheme
//! rewritten to its WebSocket counterpart, path `/ws`. When a session
//! credential is available it is passed as `session_id` in the query string;
//! otherwise the transport relies on ambient cookies.

use std::fmt;

use url::Url;

use crate::error::ConnectionError;

/// Name of the session cookie and of the query parameter carrying it.
pub const SESSION_PARAM: &str = "session_id";

/// Session credential presented to the real-time endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential(String);

impl SessionCredential {
    /// Credential from a raw session ID.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Extract the session ID from a `Cookie` header value such as
    /// `theme=dark; session_id=abc123`.
    ///
    /// Returns `None` if the cookie is absent or empty.
    pub fn from_cookie_header(header: &str) -> Option<Self> {
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_PARAM)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
            .map(Self::new)
    }

    /// Raw session ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for a `Cookie` request header.
    pub fn cookie_header(&self) -> String {
        format!("{SESSION_PARAM}={}", self.0)
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCredential(<redacted>)")
    }
}

/// Derive the WebSocket endpoint from the API base URL.
///
/// `http` becomes `ws`, `https` becomes `wss`; `ws`/`wss` are kept. Any other
/// scheme is rejected. `/ws` is appended to the base path and any existing
/// query is replaced.
pub fn websocket_url(
    base: &Url,
    session: Option<&SessionCredential>,
) -> Result<Url, ConnectionError> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ConnectionError::InvalidEndpoint(format!(
                "unsupported scheme {other:?} in {base}"
            )));
        },
    };

    let mut url = base.clone();
    url.set_scheme(scheme)
        .map_err(|()| ConnectionError::InvalidEndpoint(format!("cannot rewrite {base}")))?;

    let path = format!("{}/ws", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);

    if let Some(session) = session {
        url.query_pairs_mut().append_pair(SESSION_PARAM, session.as_str());
    }

    Ok(url)
}
