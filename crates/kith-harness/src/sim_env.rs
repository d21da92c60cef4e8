//! Simulated environment.
//!
//! Monotonic time is tokio's clock, so tests run with
//! `#[tokio::test(start_paused = true)]` and timers fire as soon as the
//! runtime is idle. Wall-clock time is derived from a fixed epoch plus the
//! elapsed tokio time. Randomness comes from a seeded ChaCha RNG.

use std::{sync::Arc, time::Duration};

use kith_core::Environment;
use kith_proto::Timestamp;
use parking_lot::Mutex;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Wall-clock time at simulation start: 2023-11-14T22:13:20Z.
pub const SIM_EPOCH: Timestamp = Timestamp::from_millis(1_700_000_000_000);

/// Deterministic environment for tests.
#[derive(Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha8Rng>>,
    start: tokio::time::Instant,
    epoch: Timestamp,
}

impl SimEnv {
    /// Environment seeded with `seed`, starting at [`SIM_EPOCH`].
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            start: tokio::time::Instant::now(),
            epoch: SIM_EPOCH,
        }
    }

    /// Time elapsed since the environment was created.
    pub fn elapsed(&self) -> Duration {
        tokio::time::Instant::now() - self.start
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl std::fmt::Debug for SimEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimEnv").field("elapsed", &self.elapsed()).finish_non_exhaustive()
    }
}

impl Environment for SimEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn wall_clock(&self) -> Timestamp {
        self.epoch.saturating_add(self.elapsed())
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().fill_bytes(buffer);
    }
}
