//! Reconnect backoff.
//!
//! Delay for attempt `n` (1-based) is `min(base × 2^(n-1), max_delay)`. With
//! the defaults that is 1s, 2s, 4s, 8s, 10s. After `max_attempts` consecutive
//! failures automatic reconnection stops until someone calls `connect()`.

use std::time::Duration;

/// Base delay before the first reconnect attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);

/// Ceiling applied to every reconnect delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(10_000);

/// Consecutive failed attempts before automatic reconnection stops.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Capped exponential backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before attempt 1.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Automatic attempts allowed before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt `attempt` (1-based).
    ///
    /// Attempt 0 is treated as attempt 1. Never exceeds `max_delay` and never
    /// overflows.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Whether another automatic attempt is allowed after `failed` consecutive
    /// failures.
    #[must_use]
    pub fn allows(&self, failed: u32) -> bool {
        failed < self.max_attempts
    }
}

/// Delay before attempt `attempt` under the default policy.
#[must_use]
pub fn delay(attempt: u32) -> Duration {
    ReconnectPolicy::default().delay(attempt)
}
