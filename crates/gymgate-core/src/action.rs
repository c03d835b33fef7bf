//! Gate side-effects.
//!
//! This module defines [`GateAction`], the instructions produced by the
//! [`crate::Gate`] state machine for the driver to execute. The gate never
//! performs I/O itself.

use crate::timer::{TimerKind, TimerToken};

/// Actions produced by the gate.
///
/// Actions are ordered. A forced logout always yields, in order: timer
/// cancellations, [`GateAction::HideCountdown`] (if a countdown was showing),
/// [`GateAction::SessionCleared`], [`GateAction::PersistSession`], and finally
/// [`GateAction::NavigateToLock`]. Drivers must yield at least one scheduling
/// turn before executing the navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateAction<I> {
    /// Register a timer callback at `deadline`, reporting `token` when it fires.
    ArmTimer {
        /// Which timer
        kind: TimerKind,
        /// Token to hand back to [`crate::Gate::on_timer`]
        token: TimerToken,
        /// When to fire
        deadline: I,
    },

    /// Drop a previously registered timer callback.
    CancelTimer {
        /// Which timer
        kind: TimerKind,
        /// Token of the cancelled timer
        token: TimerToken,
    },

    /// Show the "time's up" modal.
    ShowCountdown {
        /// Ticks left before the lock
        remaining: u32,
    },

    /// Update the ticks shown in the modal.
    UpdateCountdown {
        /// Ticks left before the lock
        remaining: u32,
    },

    /// Hide the modal.
    HideCountdown,

    /// Short vibration warning the user the lock is imminent.
    Haptic,

    /// Authentication was dropped.
    SessionCleared,

    /// Record the authentication state (best-effort).
    PersistSession {
        /// New authentication state
        authenticated: bool,
    },

    /// Return to the PIN entry screen.
    NavigateToLock,
}
