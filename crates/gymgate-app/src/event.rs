//! Application input events.
//!
//! This module defines [`AppEvent`], the set of inputs that drive the
//! [`crate::App`] state machine.
//!
//! Events originate from three sources:
//! - User input (keypad, touches, navigation requests, handoffs).
//! - The platform (visibility changes, timer callbacks, periodic ticks).
//! - Other tasks holding a [`crate::ScreenHandle`].

use gymgate_core::{TimerKind, TimerToken, Visibility};

use crate::{Handoff, KeyInput, Screen};

/// Events processed by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Keypad input.
    Key(KeyInput),

    /// Touch, scroll or any other qualifying interaction.
    Interaction,

    /// Request to switch screens.
    Navigate(Screen),

    /// App visibility changed.
    Visibility(Visibility),

    /// A timer registered through [`crate::AppAction::ArmTimer`] fired.
    TimerFired {
        /// Which timer
        kind: TimerKind,
        /// Token it was armed with
        token: TimerToken,
    },

    /// Periodic tick. Fires every due timer; used by tick-driven drivers.
    Tick,

    /// Launch an external capture flow.
    BeginHandoff(Handoff),

    /// Register or withdraw a handoff exemption directly.
    SetExempt(bool),

    /// "Stay signed in" on the countdown modal.
    CancelCountdown,

    /// Explicit logout.
    Logout,

    /// Quit the application.
    Quit,
}
