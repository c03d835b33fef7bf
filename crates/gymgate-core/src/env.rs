//! Clock and randomness for the gate.
//!
//! The gate never reads a clock itself: callers pass `now` into every
//! operation. This trait is what drivers and PIN setup use to obtain `now`
//! and salt bytes, backed by the system in production and by a virtual clock
//! with a seeded RNG in simulation.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

/// Time, sleep and entropy source.
///
/// Implementations must keep `now()` monotonic and must draw `random_bytes()`
/// from a CSPRNG outside simulation: PIN salts come from here.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type. `std::time::Instant` in production, a virtual instant in
    /// simulation.
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + std::fmt::Debug
        + Sub<Output = Duration>
        + Add<Duration, Output = Self::Instant>;

    /// Monotonic now. Idle deadlines and countdown ticks are measured on
    /// this clock.
    fn now(&self) -> Self::Instant;

    /// Wait for `duration`. Drivers only; the gate itself never sleeps.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fill `buffer` with random bytes. Deterministic per seed in simulation.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Seconds since the Unix epoch.
    ///
    /// Only used for audit records (last unlock time). Never used for timeout
    /// decisions, which run on the monotonic [`Environment::now`].
    fn wall_clock_secs(&self) -> u64;
}
