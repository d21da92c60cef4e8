//! Kith client
//!
//! Async runtime around the sans-IO [`kith_core`] state machines: the
//! connection manager task, the notification dispatcher and the REST
//! collaborators the messaging core consumes.
//!
//! # Components
//!
//! - [`ConnectionManager`]: one reconnecting connection, frames fanned out by
//!   kind
//! - [`NotificationDispatcher`]: `notification` frames fanned out by subtype
//! - [`ChatApi`]: online users, chat history, read receipts
//! - [`Transport`]: pluggable link to the real-time endpoint
//!
//! # Features
//!
//! - `transport`: [`ws::WsTransport`] over `tokio-tungstenite`
//! - `http`: [`http::HttpApi`] over `reqwest`

#![forbid(unsafe_code)]

pub mod api;
mod config;
mod error;
mod manager;
mod notifications;
mod system_env;
mod transport;

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "transport")]
pub mod ws;

pub use api::{ChatApi, HistoryMessage};
pub use config::ClientConfig;
pub use error::{ApiError, SendError, TransportError};
pub use kith_core::{
    ConnectionError, ConnectionState, Environment, HandlerError, ReconnectPolicy,
    SessionCredential, Subscription,
};
pub use manager::ConnectionManager;
pub use notifications::NotificationDispatcher;
pub use system_env::SystemEnv;
pub use transport::{Transport, TransportEvent, TransportLink};
