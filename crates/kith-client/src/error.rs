//! Client errors.

use kith_proto::ProtocolError;
use thiserror::Error;

/// Errors from a [`crate::Transport`] implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Could not open the connection.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Read or write on an open connection failed.
    #[error("stream error: {0}")]
    Stream(String),

    /// The connection is already closed.
    #[error("connection closed")]
    Closed,
}

/// Errors returned by [`crate::ConnectionManager::send`].
#[derive(Debug, Error)]
pub enum SendError {
    /// The transport is not open. The message was dropped.
    #[error("not connected")]
    NotConnected,

    /// The message could not be serialized.
    #[error(transparent)]
    Encode(#[from] ProtocolError),

    /// The manager task has stopped.
    #[error("connection manager stopped")]
    Closed,
}

/// Errors from the REST collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Non-2xx response.
    #[error("request failed with status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),

    /// Response body did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP 403.
    ///
    /// History reads for a peer with no prior conversation come back
    /// forbidden; callers treat that as an empty history.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Status { status: 403 })
    }

    /// HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } => Some(*status),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }
}
