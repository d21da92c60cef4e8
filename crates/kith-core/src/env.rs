//! Environment abstraction for deterministic testing.
//!
//! Decouples client logic from system resources (time, randomness). Enables
//! deterministic simulation with a paused clock and seeded RNG, and production
//! use with real system resources.

use std::time::Duration;

use kith_proto::Timestamp;

/// Abstract environment providing time, randomness, and async primitives.
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion, incorrect simulation setup)
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production uses `tokio::time::Instant` so paused-clock tests and real
    /// runs share one code path.
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + std::fmt::Debug
        + std::ops::Sub<Output = Duration>
        + std::ops::Add<Duration, Output = Self::Instant>;

    /// Current time (monotonic).
    ///
    /// # Invariants
    ///
    /// - Subsequent calls must return times >= previous calls.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time, used to stamp frames and messages.
    fn wall_clock(&self) -> Timestamp;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this. State machines receive time as input.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// Given the same seed, simulation environments produce the same bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Used for correlation IDs on outbound messages.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
