//! Protocol error types.

use thiserror::Error;

/// Convenience alias for protocol results.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding or encoding frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Text was not a JSON object with a recognised `type`.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// Frame could not be serialized.
    #[error("encode failed: {0}")]
    Encode(String),
}

impl ProtocolError {
    pub(crate) fn malformed(err: &serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
