//! Cancellable timer slots.
//!
//! Each slot holds at most one scheduled deadline. Arming a slot first
//! cancels whatever it held, so duplicate timers of one kind can never
//! accumulate. Every arm issues a fresh [`TimerToken`]; a callback carrying an
//! older token is stale and is ignored.

use crate::GateAction;

/// Which timer a callback belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Inactivity deadline while unlocked.
    Idle,
    /// Next 1 Hz tick of the warning countdown.
    CountdownTick,
}

/// Identity of one scheduled timer. Strictly increasing per gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(pub u64);

/// Issues timer tokens.
#[derive(Debug, Clone, Default)]
pub(crate) struct TokenSource {
    next: u64,
}

impl TokenSource {
    pub(crate) fn issue(&mut self) -> TimerToken {
        self.next += 1;
        TimerToken(self.next)
    }
}

#[derive(Debug, Clone, Copy)]
struct Armed<I> {
    token: TimerToken,
    deadline: I,
}

/// A single timer of one kind.
#[derive(Debug, Clone)]
pub(crate) struct TimerSlot<I> {
    kind: TimerKind,
    armed: Option<Armed<I>>,
}

impl<I: Copy + Ord> TimerSlot<I> {
    pub(crate) fn new(kind: TimerKind) -> Self {
        Self { kind, armed: None }
    }

    /// Replace any armed deadline with `deadline`.
    pub(crate) fn arm(&mut self, token: TimerToken, deadline: I, actions: &mut Vec<GateAction<I>>) {
        self.cancel(actions);
        self.armed = Some(Armed { token, deadline });
        actions.push(GateAction::ArmTimer { kind: self.kind, token, deadline });
    }

    /// Cancel the armed deadline, if any.
    pub(crate) fn cancel(&mut self, actions: &mut Vec<GateAction<I>>) {
        if let Some(armed) = self.armed.take() {
            actions.push(GateAction::CancelTimer { kind: self.kind, token: armed.token });
        }
    }

    /// Consume the timer if `token` is current and its deadline has passed.
    ///
    /// Returns the deadline that fired. Stale tokens and early callbacks
    /// return `None` and leave the slot untouched.
    pub(crate) fn fire(&mut self, token: TimerToken, now: I) -> Option<I> {
        match self.armed {
            Some(armed) if armed.token == token && now >= armed.deadline => {
                self.armed = None;
                Some(armed.deadline)
            },
            _ => None,
        }
    }

    /// Token of the armed timer if it is due at `now`.
    pub(crate) fn due(&self, now: I) -> Option<TimerToken> {
        self.armed.filter(|armed| now >= armed.deadline).map(|armed| armed.token)
    }

    pub(crate) fn deadline(&self) -> Option<I> {
        self.armed.map(|armed| armed.deadline)
    }

    pub(crate) fn token(&self) -> Option<TimerToken> {
        self.armed.map(|armed| armed.token)
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rearm_cancels_previous_token() {
        let mut tokens = TokenSource::default();
        let mut slot: TimerSlot<u64> = TimerSlot::new(TimerKind::Idle);
        let mut actions = Vec::new();

        let first = tokens.issue();
        slot.arm(first, 10, &mut actions);
        let second = tokens.issue();
        slot.arm(second, 20, &mut actions);

        assert_eq!(actions, vec![
            GateAction::ArmTimer { kind: TimerKind::Idle, token: first, deadline: 10 },
            GateAction::CancelTimer { kind: TimerKind::Idle, token: first },
            GateAction::ArmTimer { kind: TimerKind::Idle, token: second, deadline: 20 },
        ]);
        assert_eq!(slot.token(), Some(second));
    }

    #[test]
    fn stale_token_does_not_fire() {
        let mut tokens = TokenSource::default();
        let mut slot: TimerSlot<u64> = TimerSlot::new(TimerKind::Idle);
        let mut actions = Vec::new();

        let first = tokens.issue();
        slot.arm(first, 10, &mut actions);
        let second = tokens.issue();
        slot.arm(second, 20, &mut actions);

        assert_eq!(slot.fire(first, 30), None);
        assert_eq!(slot.fire(second, 30), Some(20));
        assert!(!slot.is_armed());
    }

    #[test]
    fn early_callback_does_not_fire() {
        let mut tokens = TokenSource::default();
        let mut slot: TimerSlot<u64> = TimerSlot::new(TimerKind::CountdownTick);
        let mut actions = Vec::new();

        let token = tokens.issue();
        slot.arm(token, 10, &mut actions);

        assert_eq!(slot.fire(token, 9), None);
        assert_eq!(slot.due(9), None);
        assert_eq!(slot.due(10), Some(token));
        assert_eq!(slot.deadline(), Some(10));
    }

    #[test]
    fn cancel_on_empty_slot_emits_nothing() {
        let mut slot: TimerSlot<u64> = TimerSlot::new(TimerKind::Idle);
        let mut actions = Vec::new();
        slot.cancel(&mut actions);
        assert!(actions.is_empty());
    }
}
