//! Connection lifecycle state machine.
//!
//! Tracks one logical connection to the real-time endpoint across any number
//! of physical transports. Uses the action pattern: methods take time as input
//! and return actions for the driver to execute.
//!
//! # State Machine
//!
//! ```text
//!                connect()              transport open
//! ┌──────────────┐ ──────> ┌────────────┐ ──────> ┌───────────┐
//! │ Disconnected │         │ Connecting │         │ Connected │
//! └──────────────┘ <────── └────────────┘         └───────────┘
//!        ↑  │      error/close                          │
//!        │  │ tick() after backoff                      │ error/close
//!        │  └──────────────> Connecting                 │
//!        └──────────────────────────────────────────────┘
//! ```
//!
//! # Reconnection
//!
//! A close with any code other than [`NORMAL_CLOSURE`] schedules a reconnect
//! unless auto-reconnect is off or the close was requested locally. Attempt
//! `n` waits [`ReconnectPolicy::delay`]`(n)`. After `max_attempts` consecutive
//! failures the machine stays disconnected until the next [`Connection::connect`].

use std::{ops::Add, time::Duration};

use kith_proto::ConnectionState;
use url::Url;

use crate::backoff::ReconnectPolicy;

/// WebSocket close code for a normal closure. Never triggers a reconnect.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a transport to `url`.
    OpenTransport {
        /// Endpoint to connect to.
        url: Url,
    },

    /// Close the current transport with this code.
    CloseTransport {
        /// WebSocket close code.
        code: u16,
    },

    /// Observable status changed. Emitted once per actual transition.
    StatusChanged(ConnectionState),

    /// Reconnect attempt `attempt` will open a transport after `delay`.
    ReconnectScheduled {
        /// 1-based attempt number.
        attempt: u32,
        /// Wait before the attempt.
        delay: Duration,
    },

    /// Automatic reconnection stopped.
    ReconnectExhausted {
        /// Consecutive failed attempts.
        attempts: u32,
    },
}

/// Connection configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Backoff schedule and attempt budget.
    pub policy: ReconnectPolicy,
    /// Reconnect after abnormal closures.
    pub auto_reconnect: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { policy: ReconnectPolicy::default(), auto_reconnect: true }
    }
}

/// Connection state machine.
///
/// This is a pure state machine: no I/O, no clock. Generic over `I` so tests
/// can drive it with virtual time.
#[derive(Debug, Clone)]
pub struct Connection<I> {
    state: ConnectionState,
    endpoint: Url,
    config: ConnectionConfig,
    /// Set by `disconnect()`, cleared by `connect()`.
    manual_close: bool,
    /// Consecutive failed attempts since the last successful open.
    attempts: u32,
    reconnect_at: Option<I>,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Create a disconnected connection for `endpoint`.
    pub fn new(endpoint: Url, config: ConnectionConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            endpoint,
            config,
            manual_close: false,
            attempts: 0,
            reconnect_at: None,
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Consecutive failed attempts since the last successful open.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// When the pending reconnect fires, if one is scheduled.
    #[must_use]
    pub fn next_deadline(&self) -> Option<I> {
        self.reconnect_at
    }

    /// Start connecting.
    ///
    /// Idempotent: returns no actions while connecting or connected. A manual
    /// connect resets the attempt budget and cancels any pending reconnect.
    pub fn connect(&mut self) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Disconnected {
            return Vec::new();
        }

        self.manual_close = false;
        self.attempts = 0;
        self.reconnect_at = None;
        self.open()
    }

    /// Transport finished opening.
    pub fn handle_open(&mut self) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Connecting {
            // Opened after a local disconnect. Close the stray link.
            if self.manual_close {
                return vec![ConnectionAction::CloseTransport { code: NORMAL_CLOSURE }];
            }
            return Vec::new();
        }

        self.attempts = 0;
        self.transition(ConnectionState::Connected).into_iter().collect()
    }

    /// Transport reported an error.
    ///
    /// Only marks the connection down. Reconnect scheduling happens in
    /// [`Connection::handle_close`], which the driver calls next.
    pub fn handle_error(&mut self) -> Vec<ConnectionAction> {
        self.transition(ConnectionState::Disconnected).into_iter().collect()
    }

    /// Transport closed with `code` (`None` when no close frame was seen).
    pub fn handle_close(&mut self, code: Option<u16>, now: I) -> Vec<ConnectionAction> {
        let mut actions: Vec<ConnectionAction> =
            self.transition(ConnectionState::Disconnected).into_iter().collect();

        if code == Some(NORMAL_CLOSURE) || self.manual_close || !self.config.auto_reconnect {
            return actions;
        }
        if self.reconnect_at.is_some() {
            return actions;
        }

        if !self.config.policy.allows(self.attempts) {
            tracing::error!(attempts = self.attempts, "reconnect budget exhausted");
            actions.push(ConnectionAction::ReconnectExhausted { attempts: self.attempts });
            return actions;
        }

        self.attempts += 1;
        let delay = self.config.policy.delay(self.attempts);
        self.reconnect_at = Some(now + delay);
        tracing::info!(attempt = self.attempts, ?delay, ?code, "reconnect scheduled");
        actions.push(ConnectionAction::ReconnectScheduled { attempt: self.attempts, delay });
        actions
    }

    /// Process timeouts. Fires the pending reconnect once its deadline passes.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        match self.reconnect_at {
            Some(at) if now >= at => {
                self.reconnect_at = None;
                if self.state != ConnectionState::Disconnected || self.manual_close {
                    return Vec::new();
                }
                self.open()
            },
            _ => Vec::new(),
        }
    }

    /// Close on request.
    ///
    /// Cancels any pending reconnect and suppresses reconnection for the
    /// resulting close event.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction> {
        self.manual_close = true;
        self.reconnect_at = None;

        if self.state == ConnectionState::Disconnected {
            return Vec::new();
        }

        let mut actions = vec![ConnectionAction::CloseTransport { code: NORMAL_CLOSURE }];
        actions.extend(self.transition(ConnectionState::Disconnected));
        actions
    }

    fn open(&mut self) -> Vec<ConnectionAction> {
        let mut actions: Vec<ConnectionAction> =
            self.transition(ConnectionState::Connecting).into_iter().collect();
        actions.push(ConnectionAction::OpenTransport { url: self.endpoint.clone() });
        actions
    }

    fn transition(&mut self, to: ConnectionState) -> Option<ConnectionAction> {
        if self.state == to {
            return None;
        }
        tracing::debug!(from = %self.state, %to, "connection state changed");
        self.state = to;
        Some(ConnectionAction::StatusChanged(to))
    }
}
