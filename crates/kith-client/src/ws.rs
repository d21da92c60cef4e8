//! WebSocket transport.
//!
//! Thin layer over `tokio-tungstenite`: text frames in and out, close codes
//! surfaced as [`TransportEvent::Closed`]. Protocol logic stays in the
//! manager.

use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use kith_core::SessionCredential;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        Message, Utf8Bytes,
        client::IntoClientRequest,
        http::{HeaderValue, header::COOKIE},
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
use url::Url;

use crate::{
    error::TransportError,
    transport::{Transport, TransportEvent, TransportLink},
};

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production transport.
///
/// When a session is set it is also sent as a `Cookie` header, for servers
/// that ignore the `session_id` query parameter.
#[derive(Debug, Clone, Default)]
pub struct WsTransport {
    session: Option<SessionCredential>,
}

impl WsTransport {
    /// Transport that relies on the endpoint URL for authentication.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that also presents `session` as a cookie.
    pub fn with_session(session: SessionCredential) -> Self {
        Self { session: Some(session) }
    }
}

impl Transport for WsTransport {
    type Link = WsLink;

    async fn open(&self, url: &Url) -> Result<WsLink, TransportError> {
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Connect(format!("invalid request: {e}")))?;

        if let Some(session) = &self.session {
            let cookie = HeaderValue::from_str(&session.cookie_header())
                .map_err(|e| TransportError::Connect(format!("invalid session cookie: {e}")))?;
            request.headers_mut().insert(COOKIE, cookie);
        }

        let (stream, response) = connect_async(request)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        tracing::debug!(status = %response.status(), "websocket handshake complete");

        let (sink, stream) = stream.split();
        Ok(WsLink { sink, stream })
    }
}

/// Open WebSocket connection.
pub struct WsLink {
    sink: SplitSink<Stream, Message>,
    stream: SplitStream<Stream>,
}

impl TransportLink for WsLink {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Stream(e.to_string()))
    }

    async fn recv(&mut self) -> TransportEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return TransportEvent::Text(text.as_str().to_owned());
                },
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return TransportEvent::Text(text),
                    Err(_) => tracing::warn!(len = bytes.len(), "dropping non-utf8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    return TransportEvent::Closed { code: frame.map(|f| u16::from(f.code)) };
                },
                // Ping/pong are answered by tungstenite.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {},
                Some(Err(e)) => return TransportEvent::Error(TransportError::Stream(e.to_string())),
                None => return TransportEvent::Closed { code: None },
            }
        }
    }

    async fn close(&mut self, code: u16) {
        let frame = CloseFrame { code: CloseCode::from(code), reason: Utf8Bytes::from_static("") };
        if let Err(e) = self.sink.send(Message::Close(Some(frame))).await {
            tracing::debug!(error = %e, "close frame not delivered");
        }
    }
}
