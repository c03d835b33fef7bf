//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::{
    fmt::Debug,
    future::Future,
    ops::{Add, Sub},
    time::Duration,
};

use gymgate_core::{TimerKind, TimerToken};

use crate::{App, AppEvent, Handoff};

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in production and simulation.
///
/// # Implementations
///
/// - **Terminal**: line-oriented stdin input, tokio timers
/// - **Simulation**: scripted events, virtual clock, injectable failures
///
/// # Associated Types
///
/// - [`Error`](Driver::Error): Platform-specific error type
/// - [`Instant`](Driver::Instant): Time representation (real or virtual)
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + Debug
        + Sub<Output = Duration>
        + Add<Duration, Output = Self::Instant>;

    /// Wait for the next input event.
    ///
    /// Returns `None` once the input source is closed, which stops the
    /// runtime.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Seconds since the Unix epoch, for session records.
    fn unix_time_secs(&self) -> u64;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App<Self::Instant>) -> Result<(), Self::Error>;

    /// Short vibration. Best-effort.
    fn haptic(&mut self);

    /// Register a timer callback. When it fires, the driver must deliver
    /// [`AppEvent::TimerFired`] with the same `kind` and `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refuses the timer.
    fn schedule_timer(
        &mut self,
        kind: TimerKind,
        token: TimerToken,
        deadline: Self::Instant,
    ) -> Result<(), Self::Error>;

    /// Drop a timer callback. Unknown tokens are ignored.
    fn cancel_timer(&mut self, kind: TimerKind, token: TimerToken);

    /// Start an external capture flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the flow cannot be started.
    fn launch_external(&mut self, handoff: Handoff) -> Result<(), Self::Error>;

    /// Stop the driver and clean up resources.
    fn stop(&mut self);
}
