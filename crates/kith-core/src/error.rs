//! Error types for the Kith client core.
//!
//! Strongly-typed errors for connection setup and for subscriber handlers.
//! Handler errors are reported and contained: one failing subscriber never
//! stops delivery to the rest.

use std::fmt;

use thiserror::Error;

/// Errors that can occur while configuring or driving a connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Base URL cannot be turned into a WebSocket endpoint.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Failure reported by an event handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("handler failed: {reason}")]
pub struct HandlerError {
    reason: String,
}

impl HandlerError {
    /// Handler error with a description.
    pub fn new(reason: impl fmt::Display) -> Self {
        Self { reason: reason.to_string() }
    }

    /// Description of the failure.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}
