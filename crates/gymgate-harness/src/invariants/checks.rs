//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use gymgate_app::Screen;
use gymgate_core::{GateState, TimerKind, Visibility};

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// An authenticated session is never showing the lock screen.
///
/// The reverse does not hold: after a forced logout the lock screen appears
/// one scheduling turn later.
pub struct AuthenticatedOffLockScreen;

impl Invariant for AuthenticatedOffLockScreen {
    fn name(&self) -> &'static str {
        "authenticated_off_lock_screen"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.is_authenticated() && state.screen == Screen::Lock {
            return Err(Violation {
                invariant: self.name(),
                message: format!("gate is {:?} but the lock screen is showing", state.state),
            });
        }
        Ok(())
    }
}

/// The countdown modal shows exactly what the gate is counting.
pub struct ModalMirrorsCountdown;

impl Invariant for ModalMirrorsCountdown {
    fn name(&self) -> &'static str {
        "modal_mirrors_countdown"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.modal_remaining != state.gate_remaining {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "modal shows {:?}, gate counts {:?}",
                    state.modal_remaining, state.gate_remaining
                ),
            });
        }
        Ok(())
    }
}

/// Each timer is armed exactly when its state needs it.
///
/// The idle deadline only exists while `Unlocked`, the countdown tick only
/// during `WarningCountdown`. With idle protection on, both must exist in
/// their states.
pub struct TimersMatchState;

impl Invariant for TimersMatchState {
    fn name(&self) -> &'static str {
        "timers_match_state"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let unlocked = state.state == GateState::Unlocked;
        let counting = matches!(state.state, GateState::WarningCountdown { .. });
        let idle = state.is_armed(TimerKind::Idle);
        let tick = state.is_armed(TimerKind::CountdownTick);

        let violation = if idle && !unlocked {
            Some("idle deadline armed outside Unlocked")
        } else if tick && !counting {
            Some("countdown tick armed outside WarningCountdown")
        } else if state.idle_protection && unlocked && !idle {
            Some("Unlocked without an idle deadline")
        } else if state.idle_protection && counting && !tick {
            Some("countdown running without a tick")
        } else {
            None
        };

        match violation {
            Some(message) => Err(Violation {
                invariant: self.name(),
                message: format!("{message} (state {:?}, armed {:?})", state.state, state.armed),
            }),
            None => Ok(()),
        }
    }
}

/// Nothing runs in the background: no unlocked session, no countdown.
pub struct BackgroundSuspends;

impl Invariant for BackgroundSuspends {
    fn name(&self) -> &'static str {
        "background_suspends"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.visibility == Visibility::Background
            && matches!(state.state, GateState::Unlocked | GateState::WarningCountdown { .. })
        {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{:?} while in the background", state.state),
            });
        }
        Ok(())
    }
}

/// The PIN entry buffer is empty whenever the session is authenticated.
pub struct KeypadClearedWhenAuthenticated;

impl Invariant for KeypadClearedWhenAuthenticated {
    fn name(&self) -> &'static str {
        "keypad_cleared_when_authenticated"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.is_authenticated() && state.keypad_len > 0 {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{} digits left in the keypad after unlock", state.keypad_len),
            });
        }
        Ok(())
    }
}

/// The driver holds exactly the timers the gate considers armed.
///
/// Only meaningful once all actions of a step have run; skipped when the
/// snapshot carries no driver timers.
pub struct DriverTimersMatchGate;

impl Invariant for DriverTimersMatchGate {
    fn name(&self) -> &'static str {
        "driver_timers_match_gate"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let Some(driver) = &state.driver_timers else {
            return Ok(());
        };

        let mut gate = state.armed.clone();
        gate.sort_by_key(|(_, token)| *token);

        if *driver != gate {
            return Err(Violation {
                invariant: self.name(),
                message: format!("driver holds {driver:?}, gate armed {gate:?}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use gymgate_core::TimerToken;

    use super::*;

    fn snapshot(state: GateState) -> SystemSnapshot {
        SystemSnapshot {
            state,
            visibility: Visibility::Foreground,
            screen: Screen::Dashboard,
            modal_remaining: None,
            gate_remaining: None,
            armed: vec![],
            exempt_pending: false,
            idle_protection: true,
            keypad_len: 0,
            driver_timers: None,
        }
    }

    #[test]
    fn lock_screen_while_authenticated_fails() {
        let mut state = snapshot(GateState::Suspended);
        state.screen = Screen::Lock;
        assert!(AuthenticatedOffLockScreen.check(&state).is_err());

        state.state = GateState::Locked;
        assert!(AuthenticatedOffLockScreen.check(&state).is_ok());
    }

    #[test]
    fn stale_modal_fails() {
        let mut state = snapshot(GateState::WarningCountdown { remaining: 3 });
        state.gate_remaining = Some(3);
        state.modal_remaining = Some(4);
        state.armed = vec![(TimerKind::CountdownTick, TimerToken(2))];

        let result = ModalMirrorsCountdown.check(&state);
        assert!(result.unwrap_err().message.contains("modal shows Some(4)"));
    }

    #[test]
    fn unlocked_without_deadline_fails_only_with_protection() {
        let mut state = snapshot(GateState::Unlocked);
        assert!(TimersMatchState.check(&state).is_err());

        state.idle_protection = false;
        assert!(TimersMatchState.check(&state).is_ok());
    }

    #[test]
    fn idle_deadline_while_suspended_fails() {
        let mut state = snapshot(GateState::Suspended);
        state.armed = vec![(TimerKind::Idle, TimerToken(1))];
        assert!(TimersMatchState.check(&state).is_err());
    }

    #[test]
    fn countdown_in_background_fails() {
        let mut state = snapshot(GateState::WarningCountdown { remaining: 2 });
        state.visibility = Visibility::Background;
        assert!(BackgroundSuspends.check(&state).is_err());
    }

    #[test]
    fn driver_timer_mismatch_fails() {
        let mut state = snapshot(GateState::Unlocked);
        state.armed = vec![(TimerKind::Idle, TimerToken(5))];

        let matching = state.clone().with_driver_timers([(TimerKind::Idle, TimerToken(5))]);
        assert!(DriverTimersMatchGate.check(&matching).is_ok());

        let leaked = state.with_driver_timers([
            (TimerKind::Idle, TimerToken(4)),
            (TimerKind::Idle, TimerToken(5)),
        ]);
        assert!(DriverTimersMatchGate.check(&leaked).is_err());
    }
}
