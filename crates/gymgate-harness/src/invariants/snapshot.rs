//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the app and its gate at a point
//! in time. Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use std::{
    fmt::Debug,
    ops::{Add, Sub},
    time::Duration,
};

use gymgate_app::{App, Screen};
use gymgate_core::{GateState, TimerKind, TimerToken, Visibility};

/// Snapshot of the whole session: gate, view model and (optionally) the
/// driver's registered timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSnapshot {
    /// Gate state.
    pub state: GateState,
    /// Last visibility reported to the gate.
    pub visibility: Visibility,
    /// Screen shown.
    pub screen: Screen,
    /// Ticks shown in the countdown modal. `None` if hidden.
    pub modal_remaining: Option<u32>,
    /// Ticks left according to the gate. `None` outside the countdown.
    pub gate_remaining: Option<u32>,
    /// Timers the gate considers armed, sorted.
    pub armed: Vec<(TimerKind, TimerToken)>,
    /// Whether a handoff exemption is pending.
    pub exempt_pending: bool,
    /// Whether idle protection is active.
    pub idle_protection: bool,
    /// Digits in the PIN entry buffer.
    pub keypad_len: usize,
    /// Timers the driver holds, sorted. `None` if not captured.
    pub driver_timers: Option<Vec<(TimerKind, TimerToken)>>,
}

impl SystemSnapshot {
    /// Capture the observable state of `app`.
    pub fn from_app<I>(app: &App<I>) -> Self
    where
        I: Copy + Ord + Debug + Sub<Output = Duration> + Add<Duration, Output = I>,
    {
        let gate = app.gate();
        let armed = [TimerKind::Idle, TimerKind::CountdownTick]
            .into_iter()
            .filter_map(|kind| gate.armed_token(kind).map(|token| (kind, token)))
            .collect();

        Self {
            state: gate.state(),
            visibility: gate.visibility(),
            screen: app.screen(),
            modal_remaining: app.countdown_modal().map(|m| m.remaining),
            gate_remaining: gate.countdown().map(|c| c.remaining),
            armed,
            exempt_pending: gate.is_exempt_pending(),
            idle_protection: gate.idle_protection_enabled(),
            keypad_len: app.keypad().len(),
            driver_timers: None,
        }
    }

    /// Attach the driver's registered timers.
    #[must_use]
    pub fn with_driver_timers(
        mut self,
        timers: impl IntoIterator<Item = (TimerKind, TimerToken)>,
    ) -> Self {
        let mut timers: Vec<_> = timers.into_iter().collect();
        timers.sort_by_key(|(_, token)| *token);
        self.driver_timers = Some(timers);
        self
    }

    /// Whether the gate considers a timer of `kind` armed.
    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.iter().any(|(k, _)| *k == kind)
    }

    /// Whether the session is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }
}
