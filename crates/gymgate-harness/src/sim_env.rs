//! Simulated environment: virtual clock and seeded randomness.
//!
//! Time only moves when a test (or the [`crate::SimDriver`]) advances it, so
//! a five-minute idle timeout runs in microseconds and every run with the
//! same seed is identical.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    ops::{Add, Sub},
    sync::{Arc, Mutex},
    time::Duration,
};

use gymgate_core::env::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Unix time at virtual time zero (2024-01-01T00:00:00Z).
const EPOCH_OFFSET_SECS: u64 = 1_704_067_200;

/// Point in virtual time, measured from the start of the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Start of the simulation.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Instant `secs` seconds after the start.
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// Instant `millis` milliseconds after the start.
    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Time elapsed since the start of the simulation.
    pub fn since_start(self) -> Duration {
        self.0
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

impl Add<Duration> for SimInstant {
    type Output = SimInstant;

    fn add(self, rhs: Duration) -> SimInstant {
        Self(self.0 + rhs)
    }
}

/// Deterministic environment for simulation.
///
/// Clones share the clock and the RNG.
#[derive(Debug, Clone)]
pub struct SimEnv {
    clock: Arc<Mutex<SimInstant>>,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEnv {
    /// Create an environment with seed 0.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Create an environment with an explicit RNG seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            clock: Arc::new(Mutex::new(SimInstant::ZERO)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Move the clock forward by `duration`. Returns the new time.
    #[allow(clippy::expect_used)]
    pub fn advance(&self, duration: Duration) -> SimInstant {
        let mut clock = self.clock.lock().expect("clock mutex poisoned");
        *clock = *clock + duration;
        *clock
    }

    /// Move the clock forward to `instant`. Earlier instants are ignored; the
    /// clock never runs backwards.
    #[allow(clippy::expect_used)]
    pub fn advance_to(&self, instant: SimInstant) -> SimInstant {
        let mut clock = self.clock.lock().expect("clock mutex poisoned");
        if instant > *clock {
            *clock = instant;
        }
        *clock
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    #[allow(clippy::expect_used)]
    fn now(&self) -> SimInstant {
        *self.clock.lock().expect("clock mutex poisoned")
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().expect("rng mutex poisoned").fill_bytes(buffer);
    }

    fn wall_clock_secs(&self) -> u64 {
        EPOCH_OFFSET_SECS + self.now().since_start().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_only_moves_forward() {
        let env = SimEnv::new();
        env.advance(Duration::from_secs(10));
        env.advance_to(SimInstant::from_secs(5));

        assert_eq!(env.now(), SimInstant::from_secs(10));
        assert_eq!(env.wall_clock_secs(), EPOCH_OFFSET_SECS + 10);
    }

    #[test]
    fn clones_share_the_clock() {
        let env = SimEnv::new();
        let clone = env.clone();
        clone.advance(Duration::from_millis(1500));

        assert_eq!(env.now() - SimInstant::ZERO, Duration::from_millis(1500));
    }

    #[test]
    fn same_seed_same_bytes() {
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        SimEnv::with_seed(99).random_bytes(&mut a);
        SimEnv::with_seed(99).random_bytes(&mut b);
        assert_eq!(a, b);

        let mut c = [0u8; 16];
        SimEnv::with_seed(100).random_bytes(&mut c);
        assert_ne!(a, c);
    }
}
