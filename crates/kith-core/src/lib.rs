//! Kith core
//!
//! Pure, I/O-free building blocks of the real-time messaging client.
//!
//! # Architecture
//!
//! Everything here follows the action pattern: state machines take inputs
//! (including the current time) and return actions for a driver to execute.
//! Nothing in this crate opens sockets, spawns tasks or reads the clock
//! directly, so every behavior is testable with synthetic time.
//!
//! # Components
//!
//! - [`connection::Connection`]: connection lifecycle and reconnect scheduling
//! - [`backoff::ReconnectPolicy`]: capped exponential backoff
//! - [`bus::EventBus`]: typed publish/subscribe with [`bus::Subscription`]
//!   handles
//! - [`endpoint`]: WebSocket endpoint derivation and session credentials
//! - [`env::Environment`]: time and randomness abstraction

#![forbid(unsafe_code)]

pub mod backoff;
pub mod bus;
pub mod connection;
pub mod endpoint;
pub mod env;
pub mod error;

pub use backoff::ReconnectPolicy;
pub use bus::{EventBus, Subscription};
pub use connection::{Connection, ConnectionAction, ConnectionConfig, NORMAL_CLOSURE};
pub use endpoint::SessionCredential;
pub use env::Environment;
pub use error::{ConnectionError, HandlerError};
pub use kith_proto::ConnectionState;
