//! Deterministic test harness for Kith.
//!
//! Everything here replaces a piece of the outside world so the client and
//! app crates can be tested without sockets, servers or real clocks:
//!
//! - [`SimEnv`]: seeded randomness and tokio-driven time. Pair with
//!   `#[tokio::test(start_paused = true)]` so reconnect timers fire
//!   instantly.
//! - [`MemoryTransport`] / [`MemoryServer`]: an in-memory WebSocket stand-in
//!   where the test plays the server.
//! - [`FakeApi`]: scripted REST responses.
//! - [`invariants`]: properties of the chat view checked after every step.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fake_api;
pub mod invariants;
pub mod memory_transport;
pub mod sim_env;

pub use fake_api::FakeApi;
pub use invariants::{
    ActiveConversationHasNoForeignMessages, Invariant, InvariantKind, InvariantRegistry,
    InvariantResult, NoDuplicateEcho, OptimisticOnlyWhenActive, ViewSnapshot, Violation,
};
pub use memory_transport::{ClientOutput, MemoryLink, MemoryServer, MemoryTransport, ServerConn};
pub use sim_env::{SIM_EPOCH, SimEnv};
