//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

use gymgate_core::{TimerKind, TimerToken};

use crate::Handoff;

/// Actions produced by the App state machine.
///
/// Generic over the instant type so timer deadlines can be real or virtual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction<I> {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Short vibration.
    Haptic,

    /// Register a timer callback.
    ArmTimer {
        /// Which timer
        kind: TimerKind,
        /// Token to report back in [`crate::AppEvent::TimerFired`]
        token: TimerToken,
        /// When to fire
        deadline: I,
    },

    /// Drop a timer callback.
    CancelTimer {
        /// Which timer
        kind: TimerKind,
        /// Token of the cancelled timer
        token: TimerToken,
    },

    /// Record the authentication state. Failures are logged and ignored.
    PersistSession {
        /// New authentication state
        authenticated: bool,
    },

    /// Show the lock screen after yielding one scheduling turn.
    NavigateToLock,

    /// Start an external capture flow. The exemption is already registered.
    LaunchExternal(Handoff),
}
