//! Connection status payload.
//!
//! Never sent by the server. The connection manager synthesizes a
//! `connection_status` frame on every lifecycle transition so status
//! observers subscribe the same way as message observers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Connection state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No transport, or the transport has closed.
    #[default]
    Disconnected,
    /// Transport open in progress.
    Connecting,
    /// Transport open.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        })
    }
}

/// Body of a `connection_status` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// New state.
    pub status: ConnectionState,
    /// Local time of the transition.
    #[serde(default)]
    pub timestamp: Timestamp,
}
