//! In-memory transport.
//!
//! [`MemoryTransport`] is handed to the connection manager; the paired
//! [`MemoryServer`] stays with the test and plays the server side. Every
//! successful open yields a [`ServerConn`] through [`MemoryServer::accept`].
//! Opens can be scripted to fail with [`MemoryServer::refuse_next`].

use std::sync::Arc;

use kith_client::{Transport, TransportError, TransportEvent, TransportLink};
use kith_proto::Frame;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use url::Url;

/// What the client wrote on a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientOutput {
    /// A text frame.
    Text(String),
    /// A close frame with this code.
    Close(u16),
}

#[derive(Default)]
struct State {
    opened: Vec<Url>,
    refusals: u32,
}

/// Client half, given to the connection manager.
pub struct MemoryTransport {
    state: Arc<Mutex<State>>,
    accepted: mpsc::UnboundedSender<ServerConn>,
}

/// Test half: observes opens and accepts links.
pub struct MemoryServer {
    state: Arc<Mutex<State>>,
    accepted: mpsc::UnboundedReceiver<ServerConn>,
}

impl MemoryTransport {
    /// A connected transport/server pair.
    pub fn pair() -> (MemoryTransport, MemoryServer) {
        let state = Arc::new(Mutex::new(State::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        (
            MemoryTransport { state: Arc::clone(&state), accepted: tx },
            MemoryServer { state, accepted: rx },
        )
    }
}

impl Transport for MemoryTransport {
    type Link = MemoryLink;

    async fn open(&self, url: &Url) -> Result<MemoryLink, TransportError> {
        {
            let mut state = self.state.lock();
            state.opened.push(url.clone());
            if state.refusals > 0 {
                state.refusals -= 1;
                return Err(TransportError::Connect("connection refused".into()));
            }
        }

        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();
        let conn = ServerConn { url: url.clone(), to_client, from_client };
        if self.accepted.send(conn).is_err() {
            return Err(TransportError::Connect("server gone".into()));
        }
        Ok(MemoryLink { to_server, from_server })
    }
}

impl MemoryServer {
    /// Wait for the next successful open.
    ///
    /// Returns `None` once the transport has been dropped.
    pub async fn accept(&mut self) -> Option<ServerConn> {
        self.accepted.recv().await
    }

    /// An already-accepted link, without waiting.
    pub fn try_accept(&mut self) -> Option<ServerConn> {
        self.accepted.try_recv().ok()
    }

    /// Fail the next `n` opens.
    pub fn refuse_next(&self, n: u32) {
        self.state.lock().refusals = n;
    }

    /// Number of open attempts, successful or not.
    pub fn open_count(&self) -> usize {
        self.state.lock().opened.len()
    }

    /// URLs of every open attempt, in order.
    pub fn opened_urls(&self) -> Vec<Url> {
        self.state.lock().opened.clone()
    }
}

/// Client side of one link.
pub struct MemoryLink {
    to_server: mpsc::UnboundedSender<ClientOutput>,
    from_server: mpsc::UnboundedReceiver<TransportEvent>,
}

impl TransportLink for MemoryLink {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.to_server.send(ClientOutput::Text(text)).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> TransportEvent {
        match self.from_server.recv().await {
            Some(event) => event,
            None => TransportEvent::Closed { code: None },
        }
    }

    async fn close(&mut self, code: u16) {
        let _ = self.to_server.send(ClientOutput::Close(code));
    }
}

/// Server side of one link.
pub struct ServerConn {
    url: Url,
    to_client: mpsc::UnboundedSender<TransportEvent>,
    from_client: mpsc::UnboundedReceiver<ClientOutput>,
}

impl ServerConn {
    /// URL the client opened.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Deliver a frame to the client.
    pub fn push(&self, frame: &Frame) {
        match frame.encode() {
            Ok(text) => self.push_text(text),
            Err(error) => tracing::error!(%error, "test frame does not encode"),
        }
    }

    /// Deliver raw text to the client.
    pub fn push_text(&self, text: impl Into<String>) {
        let _ = self.to_client.send(TransportEvent::Text(text.into()));
    }

    /// Close the link from the server side.
    pub fn close(&self, code: Option<u16>) {
        let _ = self.to_client.send(TransportEvent::Closed { code });
    }

    /// Fail the link.
    pub fn fail(&self, reason: &str) {
        let _ = self.to_client.send(TransportEvent::Error(TransportError::Stream(reason.into())));
    }

    /// Wait for the next thing the client writes.
    ///
    /// Returns `None` once the client dropped the link.
    pub async fn recv(&mut self) -> Option<ClientOutput> {
        self.from_client.recv().await
    }

    /// Wait for the next text frame, skipping close frames.
    pub async fn recv_text(&mut self) -> Option<String> {
        loop {
            match self.from_client.recv().await? {
                ClientOutput::Text(text) => return Some(text),
                ClientOutput::Close(_) => {},
            }
        }
    }

    /// Everything the client has written so far, without waiting.
    pub fn drain(&mut self) -> Vec<ClientOutput> {
        let mut out = Vec::new();
        while let Ok(item) = self.from_client.try_recv() {
            out.push(item);
        }
        out
    }
}
