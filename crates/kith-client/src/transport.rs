//! Transport abstraction.
//!
//! The connection manager drives any [`Transport`]: the WebSocket transport in
//! production, an in-memory transport in tests. A transport opens
//! [`TransportLink`]s; a link moves text frames and reports lifecycle events.

use std::future::Future;

use url::Url;

use crate::error::TransportError;

/// Something that happened on an open link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame arrived.
    Text(String),

    /// The peer closed the link. `code` is `None` if no close frame was seen.
    Closed {
        /// WebSocket close code.
        code: Option<u16>,
    },

    /// The link failed. No further events follow.
    Error(TransportError),
}

/// Opens links to the real-time endpoint.
pub trait Transport: Send + Sync + 'static {
    /// Link type produced by [`Transport::open`].
    type Link: TransportLink;

    /// Open a link to `url`.
    fn open(&self, url: &Url) -> impl Future<Output = Result<Self::Link, TransportError>> + Send;
}

/// An open, bidirectional text link.
pub trait TransportLink: Send + 'static {
    /// Write one text frame.
    fn send(&mut self, text: String) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Wait for the next event.
    ///
    /// Must be cancel-safe: the manager polls it inside `select!`.
    fn recv(&mut self) -> impl Future<Output = TransportEvent> + Send;

    /// Close the link with `code`. Best-effort.
    fn close(&mut self, code: u16) -> impl Future<Output = ()> + Send;
}
