//! Explicit transition table for the session gate.
//!
//! [`transition`] is a pure function `(state, event) -> (next, effects)`. It
//! holds every decision the gate makes; [`crate::Gate`] only filters inputs
//! (stale timers, repeated visibility signals), consumes the exemption flag
//! and turns [`Effect`]s into concrete [`crate::GateAction`]s with tokens and
//! deadlines.
//!
//! # State Machine
//!
//! ```text
//! ┌────────┐ LoginAccepted ┌──────────┐ IdleExpired ┌──────────────────┐
//! │ Locked │──────────────>│ Unlocked │────────────>│ WarningCountdown │
//! └────────┘               └──────────┘<────────────└──────────────────┘
//!     ^                      │      ^    Cancelled      │          │
//!     │                      │      │                   │          │
//!     │          Backgrounded│      │Foregrounded       │last tick │Backgrounded
//!     │                      v      │{ exempt }         │          │
//!     │                   ┌───────────┐                 │          │
//!     │<──────────────────│ Suspended │<────────────────┼──────────┘
//!     │   Foregrounded    └───────────┘                 │
//!     │   { !exempt }                                   │
//!     └─────────────────────────────────────────────────┘
//! ```
//!
//! `Logout` from any authenticated state goes straight to `Locked`.

use crate::gate::GateState;

/// Inputs to the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    /// PIN matched. `foreground` is the visibility at the time of login.
    LoginAccepted {
        /// Whether the app is currently in the foreground
        foreground: bool,
    },
    /// Qualifying user interaction.
    Interaction,
    /// Idle deadline fired.
    IdleExpired,
    /// One countdown tick elapsed.
    CountdownTick,
    /// User dismissed the countdown modal.
    CountdownCancelled,
    /// Explicit logout.
    Logout,
    /// App moved to the background.
    Backgrounded,
    /// App returned to the foreground. `exempt` is the value of the
    /// exemption flag consumed for this very transition.
    Foregrounded {
        /// Whether a pending handoff exemption was consumed
        exempt: bool,
    },
}

/// Abstract effects, materialized by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Arm the idle deadline from the event time.
    ArmIdle,
    /// Cancel the idle deadline.
    CancelIdle,
    /// Arm the next countdown tick.
    ArmCountdownTick,
    /// Cancel the pending countdown tick.
    CancelCountdownTick,
    /// Show the countdown modal.
    ShowCountdown {
        /// Ticks left
        remaining: u32,
    },
    /// Update the countdown modal.
    UpdateCountdown {
        /// Ticks left
        remaining: u32,
    },
    /// Hide the countdown modal.
    HideCountdown,
    /// Vibrate.
    Haptic,
    /// Drop authentication.
    SessionCleared,
    /// Persist the authentication state.
    Persist {
        /// New authentication state
        authenticated: bool,
    },
    /// Show the lock screen.
    NavigateToLock,
}

/// Countdown parameters the table needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownPolicy {
    /// Ticks shown when the countdown starts.
    pub ticks: u32,
    /// Remaining-tick count at which to vibrate. Zero disables the pulse.
    pub haptic_at: u32,
}

/// Outcome of one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State after the event.
    pub next: GateState,
    /// Effects to apply, in order.
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay(state: GateState) -> Self {
        Self { next: state, effects: Vec::new() }
    }

    fn to(next: GateState, effects: Vec<Effect>) -> Self {
        Self { next, effects }
    }
}

/// Compute the next state and effects for `event` in `state`.
pub fn transition(state: GateState, event: GateEvent, policy: CountdownPolicy) -> Transition {
    use GateState::{Locked, Suspended, Unlocked, WarningCountdown};

    match (state, event) {
        (Locked, GateEvent::LoginAccepted { foreground: true }) => {
            Transition::to(Unlocked, vec![Effect::Persist { authenticated: true }, Effect::ArmIdle])
        },
        (Locked, GateEvent::LoginAccepted { foreground: false }) => {
            Transition::to(Suspended, vec![Effect::Persist { authenticated: true }])
        },
        // Re-authentication rearms from zero
        (Unlocked, GateEvent::LoginAccepted { .. }) => Transition::to(Unlocked, vec![Effect::ArmIdle]),
        (WarningCountdown { .. }, GateEvent::LoginAccepted { .. }) => Transition::to(Unlocked, vec![
            Effect::CancelCountdownTick,
            Effect::HideCountdown,
            Effect::ArmIdle,
        ]),

        (Unlocked, GateEvent::Interaction) => Transition::to(Unlocked, vec![Effect::ArmIdle]),

        (Unlocked, GateEvent::IdleExpired) => {
            Transition::to(WarningCountdown { remaining: policy.ticks }, vec![
                Effect::ShowCountdown { remaining: policy.ticks },
                Effect::ArmCountdownTick,
            ])
        },

        (WarningCountdown { remaining }, GateEvent::CountdownTick) => {
            let remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                return forced_logout(state);
            }

            let mut effects = vec![Effect::UpdateCountdown { remaining }];
            if remaining == policy.haptic_at {
                effects.push(Effect::Haptic);
            }
            effects.push(Effect::ArmCountdownTick);
            Transition::to(WarningCountdown { remaining }, effects)
        },

        (WarningCountdown { .. }, GateEvent::CountdownCancelled) => Transition::to(Unlocked, vec![
            Effect::CancelCountdownTick,
            Effect::HideCountdown,
            Effect::ArmIdle,
        ]),

        (Unlocked, GateEvent::Backgrounded) => Transition::to(Suspended, vec![Effect::CancelIdle]),
        (WarningCountdown { .. }, GateEvent::Backgrounded) => {
            Transition::to(Suspended, vec![
                Effect::CancelIdle,
                Effect::CancelCountdownTick,
                Effect::HideCountdown,
            ])
        },

        (Suspended, GateEvent::Foregrounded { exempt: true }) => {
            Transition::to(Unlocked, vec![Effect::ArmIdle])
        },
        (Suspended, GateEvent::Foregrounded { exempt: false }) => forced_logout(state),

        (Unlocked | WarningCountdown { .. } | Suspended, GateEvent::Logout) => forced_logout(state),

        // Everything else is a no-op: events for a state that has already
        // moved on, input while suspended, and visibility changes while
        // locked.
        _ => Transition::stay(state),
    }
}

/// Effects of an unconditional logout from an authenticated state.
fn forced_logout(state: GateState) -> Transition {
    let mut effects = vec![Effect::CancelIdle, Effect::CancelCountdownTick];
    if matches!(state, GateState::WarningCountdown { .. }) {
        effects.push(Effect::HideCountdown);
    }
    effects.extend([
        Effect::SessionCleared,
        Effect::Persist { authenticated: false },
        Effect::NavigateToLock,
    ]);
    Transition::to(GateState::Locked, effects)
}
