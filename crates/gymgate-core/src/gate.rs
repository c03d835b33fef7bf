//! Session gate state machine.
//!
//! Owns authentication, the idle deadline, the warning countdown and the
//! handoff exemption, and is the only writer of each. Uses the action pattern:
//! methods take time as input and return [`GateAction`]s for the driver to
//! execute. This keeps the state machine pure (no I/O, no timers of its own)
//! and makes testing with a virtual clock straightforward.
//!
//! The visibility monitor lives here as [`Gate::on_visibility_change`]. On a
//! return to the foreground it reads and clears the exemption flag in the same
//! `&mut self` step that decides whether to force a logout, so the flag's value
//! at the moment of the transition is the one that counts. A multi-threaded
//! host must serialize all calls (one lock or one channel around the whole
//! gate), never share the registry separately.

use std::{
    fmt::Debug,
    ops::{Add, Sub},
    time::Duration,
};

use crate::{
    GateAction,
    error::GateError,
    exemption::ExemptionRegistry,
    pin::{Pin, PinVerifier},
    timer::{TimerKind, TimerSlot, TimerToken, TokenSource},
    transition::{CountdownPolicy, Effect, GateEvent, transition},
    visibility::Visibility,
};

/// Default inactivity period before the warning countdown starts.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default number of countdown ticks.
pub const DEFAULT_COUNTDOWN_TICKS: u32 = 10;

/// Default countdown tick length.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Default remaining-tick count for the haptic pulse.
pub const DEFAULT_HAPTIC_AT: u32 = 2;

/// Longest accepted inactivity period.
pub const MAX_IDLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest accepted countdown tick.
pub const MAX_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Most countdown ticks accepted.
pub const MAX_COUNTDOWN_TICKS: u32 = 600;

/// Gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// PIN required.
    Locked,
    /// Authenticated, in the foreground, idle deadline armed.
    Unlocked,
    /// Idle deadline passed, lock imminent.
    WarningCountdown {
        /// Ticks left before the lock
        remaining: u32,
    },
    /// Authenticated but in the background. No timers run.
    Suspended,
}

impl GateState {
    /// Whether the session is authenticated.
    pub fn is_authenticated(self) -> bool {
        !matches!(self, Self::Locked)
    }
}

/// Gate configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Inactivity period before the warning countdown.
    pub idle_timeout: Duration,
    /// Countdown length in ticks.
    pub countdown_ticks: u32,
    /// Countdown tick length.
    pub tick_interval: Duration,
    /// Remaining-tick count at which to vibrate (0 disables).
    pub haptic_at: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            countdown_ticks: DEFAULT_COUNTDOWN_TICKS,
            tick_interval: DEFAULT_TICK_INTERVAL,
            haptic_at: DEFAULT_HAPTIC_AT,
        }
    }
}

impl GateConfig {
    /// Check the configuration can drive a lock cycle.
    ///
    /// # Errors
    ///
    /// - `GateError::InvalidConfig` for zero durations or ticks, values above
    ///   [`MAX_IDLE_TIMEOUT`], [`MAX_TICK_INTERVAL`] or [`MAX_COUNTDOWN_TICKS`],
    ///   or a haptic threshold that the countdown never reaches
    pub fn validate(&self) -> Result<(), GateError> {
        if self.idle_timeout.is_zero() {
            return Err(GateError::InvalidConfig { reason: "idle timeout must be non-zero" });
        }
        if self.idle_timeout > MAX_IDLE_TIMEOUT {
            return Err(GateError::InvalidConfig { reason: "idle timeout longer than a day" });
        }
        if self.tick_interval.is_zero() {
            return Err(GateError::InvalidConfig { reason: "tick interval must be non-zero" });
        }
        if self.tick_interval > MAX_TICK_INTERVAL {
            return Err(GateError::InvalidConfig { reason: "tick interval longer than a minute" });
        }
        if self.countdown_ticks == 0 {
            return Err(GateError::InvalidConfig { reason: "countdown needs at least one tick" });
        }
        if self.countdown_ticks > MAX_COUNTDOWN_TICKS {
            return Err(GateError::InvalidConfig { reason: "countdown has too many ticks" });
        }
        if self.haptic_at >= self.countdown_ticks {
            return Err(GateError::InvalidConfig {
                reason: "haptic threshold must be below countdown length",
            });
        }
        Ok(())
    }

    fn policy(&self) -> CountdownPolicy {
        CountdownPolicy { ticks: self.countdown_ticks, haptic_at: self.haptic_at }
    }
}

/// Countdown modal contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownView {
    /// Ticks left before the lock.
    pub remaining: u32,
    /// Ticks the countdown started with.
    pub total: u32,
}

/// Session gate.
///
/// This is a pure state machine - no I/O, no Environment storage. Time is
/// passed as parameters to methods that need it.
///
/// Generic over `Instant` to support both real time and virtual time for
/// deterministic testing.
#[derive(Debug, Clone)]
pub struct Gate<I> {
    state: GateState,
    visibility: Visibility,
    exemption: ExemptionRegistry,
    idle: TimerSlot<I>,
    countdown: TimerSlot<I>,
    tokens: TokenSource,
    config: GateConfig,
    verifier: PinVerifier,
    /// Cleared after a scheduling failure, restored on the next login.
    idle_protection: bool,
}

impl<I> Gate<I>
where
    I: Copy + Ord + Debug + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    /// Create a locked, foreground gate.
    ///
    /// # Errors
    ///
    /// - `GateError::InvalidConfig` if `config` fails validation
    pub fn new(config: GateConfig, verifier: PinVerifier) -> Result<Self, GateError> {
        config.validate()?;

        Ok(Self {
            state: GateState::Locked,
            visibility: Visibility::Foreground,
            exemption: ExemptionRegistry::new(),
            idle: TimerSlot::new(TimerKind::Idle),
            countdown: TimerSlot::new(TimerKind::CountdownTick),
            tokens: TokenSource::default(),
            config,
            verifier,
            idle_protection: true,
        })
    }

    /// Current state.
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Whether the session is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Last visibility reported by the host.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether a handoff exemption is waiting to be consumed.
    pub fn is_exempt_pending(&self) -> bool {
        self.exemption.is_pending()
    }

    /// Countdown modal contents. `None` unless a countdown is running.
    pub fn countdown(&self) -> Option<CountdownView> {
        match self.state {
            GateState::WarningCountdown { remaining } => {
                Some(CountdownView { remaining, total: self.config.countdown_ticks })
            },
            _ => None,
        }
    }

    /// Armed idle deadline. `None` unless unlocked in the foreground.
    pub fn idle_deadline(&self) -> Option<I> {
        self.idle.deadline()
    }

    /// Deadline of the next countdown tick. `None` unless a countdown runs.
    pub fn next_tick(&self) -> Option<I> {
        self.countdown.deadline()
    }

    /// Token of the armed timer of `kind`, if any.
    pub fn armed_token(&self, kind: TimerKind) -> Option<TimerToken> {
        match kind {
            TimerKind::Idle => self.idle.token(),
            TimerKind::CountdownTick => self.countdown.token(),
        }
    }

    /// Whether idle protection is active for this session.
    pub fn idle_protection_enabled(&self) -> bool {
        self.idle_protection
    }

    /// Active configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Secret comparison gate.
    pub fn verifier(&self) -> &PinVerifier {
        &self.verifier
    }

    /// Authenticate with `pin`.
    ///
    /// On success the session is unlocked and the idle deadline armed from
    /// `now`. Logging in again while authenticated rearms the deadline.
    ///
    /// # Errors
    ///
    /// - `GateError::InvalidSecret` if the PIN does not match; state unchanged
    pub fn login(&mut self, pin: &Pin, now: I) -> Result<Vec<GateAction<I>>, GateError> {
        if let Err(e) = self.verifier.verify(pin) {
            tracing::info!(state = ?self.state, "PIN rejected");
            return Err(e);
        }

        self.idle_protection = true;
        let foreground = self.visibility.is_foreground();
        let actions = self.apply(GateEvent::LoginAccepted { foreground }, now);
        tracing::info!(state = ?self.state, "PIN accepted");
        Ok(actions)
    }

    /// Drop authentication. Unconditional and idempotent.
    pub fn logout(&mut self, now: I) -> Vec<GateAction<I>> {
        let actions = self.apply(GateEvent::Logout, now);
        if !actions.is_empty() {
            tracing::info!("logged out");
        }
        actions
    }

    /// Qualifying user interaction. Rearms the idle deadline while unlocked.
    ///
    /// Ignored during the warning countdown (only [`Gate::cancel_countdown`]
    /// dismisses it), while locked, and while in the background.
    pub fn interact(&mut self, now: I) -> Vec<GateAction<I>> {
        self.apply(GateEvent::Interaction, now)
    }

    /// Dismiss the warning countdown and stay unlocked.
    pub fn cancel_countdown(&mut self, now: I) -> Vec<GateAction<I>> {
        self.apply(GateEvent::CountdownCancelled, now)
    }

    /// Register (or withdraw) a handoff exemption.
    ///
    /// See [`ExemptionRegistry::set_exempt`].
    pub fn set_exempt(&mut self, on: bool) {
        self.exemption.set_exempt(on);
    }

    /// Visibility monitor.
    ///
    /// Never fails: this runs inside the host's visibility callback, where no
    /// caller could react to an error.
    ///
    /// - Repeated identical signals are not transitions and do nothing.
    /// - While locked only the visibility is recorded.
    /// - Background cancels every timer and hides the countdown.
    /// - Foreground consumes a pending exemption and resumes; without one it
    ///   forces a logout.
    pub fn on_visibility_change(&mut self, visibility: Visibility, now: I) -> Vec<GateAction<I>> {
        if visibility == self.visibility {
            tracing::debug!(?visibility, "duplicate visibility signal ignored");
            return Vec::new();
        }
        self.visibility = visibility;

        if !self.is_authenticated() {
            tracing::debug!(?visibility, "visibility change while locked");
            return Vec::new();
        }

        let event = match visibility {
            Visibility::Background => GateEvent::Backgrounded,
            Visibility::Foreground => {
                let exempt = self.exemption.consume();
                if exempt {
                    tracing::info!("foreground return after handoff, re-authentication skipped");
                } else {
                    tracing::info!("foreground return, re-authentication required");
                }
                GateEvent::Foregrounded { exempt }
            },
        };

        self.apply(event, now)
    }

    /// Timer callback.
    ///
    /// Stale tokens (cancelled or superseded timers) and callbacks that
    /// arrive before the deadline are ignored.
    pub fn on_timer(&mut self, kind: TimerKind, token: TimerToken, now: I) -> Vec<GateAction<I>> {
        let slot = match kind {
            TimerKind::Idle => &mut self.idle,
            TimerKind::CountdownTick => &mut self.countdown,
        };

        let Some(deadline) = slot.fire(token, now) else {
            tracing::debug!(?kind, ?token, "stale timer callback ignored");
            return Vec::new();
        };

        let event = match kind {
            TimerKind::Idle => GateEvent::IdleExpired,
            TimerKind::CountdownTick => GateEvent::CountdownTick,
        };

        // Follow-up timers are scheduled from the deadline, not from the
        // callback time, so late callbacks do not stretch the countdown.
        self.apply(event, deadline)
    }

    /// Fire every timer due at `now`, in deadline order.
    ///
    /// For tick-driven runtimes and virtual clocks: advancing the clock by the
    /// full countdown and polling once runs every tick.
    pub fn poll_timers(&mut self, now: I) -> Vec<GateAction<I>> {
        let mut actions = Vec::new();

        loop {
            let due = [
                self.idle.due(now).map(|t| (TimerKind::Idle, t, self.idle.deadline())),
                self.countdown
                    .due(now)
                    .map(|t| (TimerKind::CountdownTick, t, self.countdown.deadline())),
            ];

            let Some((kind, token, _)) = due.into_iter().flatten().min_by_key(|(_, _, d)| *d)
            else {
                break;
            };

            actions.extend(self.on_timer(kind, token, now));
        }

        actions
    }

    /// Turn off idle protection after the platform failed to schedule a timer.
    ///
    /// Cancels both timers and stops arming new ones until the next login. The
    /// session itself is untouched; foreground re-entry checks keep working.
    pub fn disable_idle_protection(&mut self, error: &GateError) -> Vec<GateAction<I>> {
        tracing::warn!(%error, "idle protection disabled for this session");
        self.idle_protection = false;

        let mut actions = Vec::new();
        self.idle.cancel(&mut actions);
        self.countdown.cancel(&mut actions);
        if let GateState::WarningCountdown { .. } = self.state {
            self.state = GateState::Unlocked;
            actions.push(GateAction::HideCountdown);
        }
        actions
    }

    /// Run one event through the transition table and materialize effects.
    ///
    /// `at` is the logical time of the event: `now` for user and host input,
    /// the fired deadline for timer events.
    fn apply(&mut self, event: GateEvent, at: I) -> Vec<GateAction<I>> {
        let from = self.state;
        let step = transition(from, event, self.config.policy());
        self.state = step.next;

        if from != step.next {
            tracing::debug!(?from, to = ?step.next, ?event, "gate transition");
        }

        let mut actions = Vec::with_capacity(step.effects.len());
        for effect in step.effects {
            match effect {
                Effect::ArmIdle => {
                    if self.idle_protection {
                        let token = self.tokens.issue();
                        self.idle.arm(token, at + self.config.idle_timeout, &mut actions);
                    }
                },
                Effect::CancelIdle => self.idle.cancel(&mut actions),
                Effect::ArmCountdownTick => {
                    if self.idle_protection {
                        let token = self.tokens.issue();
                        self.countdown.arm(token, at + self.config.tick_interval, &mut actions);
                    }
                },
                Effect::CancelCountdownTick => self.countdown.cancel(&mut actions),
                Effect::ShowCountdown { remaining } => {
                    actions.push(GateAction::ShowCountdown { remaining });
                },
                Effect::UpdateCountdown { remaining } => {
                    actions.push(GateAction::UpdateCountdown { remaining });
                },
                Effect::HideCountdown => actions.push(GateAction::HideCountdown),
                Effect::Haptic => actions.push(GateAction::Haptic),
                Effect::SessionCleared => actions.push(GateAction::SessionCleared),
                Effect::Persist { authenticated } => {
                    actions.push(GateAction::PersistSession { authenticated });
                },
                Effect::NavigateToLock => actions.push(GateAction::NavigateToLock),
            }
        }

        debug_assert!(
            !self.idle.is_armed() || self.state == GateState::Unlocked,
            "idle deadline armed outside Unlocked"
        );
        debug_assert!(
            !self.countdown.is_armed() || matches!(self.state, GateState::WarningCountdown { .. }),
            "countdown tick armed outside WarningCountdown"
        );

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;

    #[derive(Clone)]
    struct TestEnv;

    impl Environment for TestEnv {
        type Instant = std::time::Instant;

        fn now(&self) -> std::time::Instant {
            std::time::Instant::now()
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = i as u8;
            }
        }

        fn wall_clock_secs(&self) -> u64 {
            0
        }
    }

    fn pin(s: &str) -> Pin {
        Pin::parse(s).unwrap()
    }

    fn gate() -> Gate<std::time::Instant> {
        let verifier = PinVerifier::new(&TestEnv, &pin("1234"));
        Gate::new(GateConfig::default(), verifier).unwrap()
    }

    #[test]
    fn login_arms_idle_deadline() {
        let t0 = TestEnv.now();
        let mut gate = gate();

        let actions = gate.login(&pin("1234"), t0).unwrap();

        assert_eq!(gate.state(), GateState::Unlocked);
        assert_eq!(gate.idle_deadline(), Some(t0 + DEFAULT_IDLE_TIMEOUT));
        assert!(matches!(actions.as_slice(), [
            GateAction::PersistSession { authenticated: true },
            GateAction::ArmTimer { kind: TimerKind::Idle, .. }
        ]));
    }

    #[test]
    fn wrong_pin_keeps_gate_locked() {
        let t0 = TestEnv.now();
        let mut gate = gate();

        assert_eq!(gate.login(&pin("4321"), t0), Err(GateError::InvalidSecret));
        assert_eq!(gate.state(), GateState::Locked);
        assert_eq!(gate.idle_deadline(), None);
    }

    #[test]
    fn interaction_pushes_deadline_back() {
        let t0 = TestEnv.now();
        let mut gate = gate();
        gate.login(&pin("1234"), t0).unwrap();

        let t1 = t0 + Duration::from_secs(60);
        let actions = gate.interact(t1);

        assert_eq!(gate.idle_deadline(), Some(t1 + DEFAULT_IDLE_TIMEOUT));
        assert!(matches!(actions.as_slice(), [
            GateAction::CancelTimer { kind: TimerKind::Idle, .. },
            GateAction::ArmTimer { kind: TimerKind::Idle, .. }
        ]));
    }

    #[test]
    fn superseded_idle_token_is_ignored() {
        let t0 = TestEnv.now();
        let mut gate = gate();
        gate.login(&pin("1234"), t0).unwrap();
        let stale = gate.armed_token(TimerKind::Idle).unwrap();

        gate.interact(t0 + Duration::from_secs(1));

        let actions = gate.on_timer(TimerKind::Idle, stale, t0 + DEFAULT_IDLE_TIMEOUT);
        assert!(actions.is_empty());
        assert_eq!(gate.state(), GateState::Unlocked);
    }

    #[test]
    fn countdown_runs_exactly_configured_ticks() {
        let t0 = TestEnv.now();
        let mut gate = gate();
        gate.login(&pin("1234"), t0).unwrap();

        let deadline = t0 + DEFAULT_IDLE_TIMEOUT;
        gate.poll_timers(deadline);
        assert_eq!(gate.countdown(), Some(CountdownView { remaining: 10, total: 10 }));

        gate.poll_timers(deadline + Duration::from_secs(9));
        assert_eq!(gate.countdown().map(|c| c.remaining), Some(1));
        assert!(gate.is_authenticated());

        let actions = gate.poll_timers(deadline + Duration::from_secs(10));
        assert!(!gate.is_authenticated());
        assert_eq!(actions.last(), Some(&GateAction::NavigateToLock));
    }

    #[test]
    fn cancel_countdown_rearms_from_cancel_time() {
        let t0 = TestEnv.now();
        let mut gate = gate();
        gate.login(&pin("1234"), t0).unwrap();

        let deadline = t0 + DEFAULT_IDLE_TIMEOUT;
        gate.poll_timers(deadline + Duration::from_secs(3));

        let cancel_at = deadline + Duration::from_secs(3);
        let actions = gate.cancel_countdown(cancel_at);

        assert_eq!(gate.state(), GateState::Unlocked);
        assert_eq!(gate.idle_deadline(), Some(cancel_at + DEFAULT_IDLE_TIMEOUT));
        assert_eq!(gate.next_tick(), None);
        assert!(actions.contains(&GateAction::HideCountdown));
    }

    #[test]
    fn exempt_return_consumes_flag_once() {
        let t0 = TestEnv.now();
        let mut gate = gate();
        gate.login(&pin("1234"), t0).unwrap();

        gate.set_exempt(true);
        gate.on_visibility_change(Visibility::Background, t0);
        gate.on_visibility_change(Visibility::Foreground, t0);

        assert!(gate.is_authenticated());
        assert!(!gate.is_exempt_pending());
        assert!(gate.idle_deadline().is_some());

        gate.on_visibility_change(Visibility::Background, t0);
        gate.on_visibility_change(Visibility::Foreground, t0);
        assert!(!gate.is_authenticated());
    }

    #[test]
    fn duplicate_foreground_signal_is_not_a_transition() {
        let t0 = TestEnv.now();
        let mut gate = gate();
        gate.login(&pin("1234"), t0).unwrap();

        let actions = gate.on_visibility_change(Visibility::Foreground, t0);
        assert!(actions.is_empty());
        assert!(gate.is_authenticated());
    }

    #[test]
    fn visibility_while_locked_leaves_exemption_alone() {
        let t0 = TestEnv.now();
        let mut gate = gate();
        gate.set_exempt(true);

        gate.on_visibility_change(Visibility::Background, t0);
        gate.on_visibility_change(Visibility::Foreground, t0);

        assert!(gate.is_exempt_pending());
        assert_eq!(gate.visibility(), Visibility::Foreground);
    }

    #[test]
    fn scheduling_failure_disables_protection_until_next_login() {
        let t0 = TestEnv.now();
        let mut gate = gate();
        gate.login(&pin("1234"), t0).unwrap();

        let error = GateError::SchedulingFailure {
            kind: TimerKind::Idle,
            reason: "no timer slots".to_string(),
        };
        gate.disable_idle_protection(&error);

        assert!(!gate.idle_protection_enabled());
        assert_eq!(gate.idle_deadline(), None);
        assert!(gate.interact(t0 + Duration::from_secs(1)).is_empty());
        assert!(gate.poll_timers(t0 + DEFAULT_IDLE_TIMEOUT * 2).is_empty());
        assert!(gate.is_authenticated());

        gate.login(&pin("1234"), t0 + Duration::from_secs(2)).unwrap();
        assert!(gate.idle_protection_enabled());
        assert!(gate.idle_deadline().is_some());
    }

    #[test]
    fn logout_is_idempotent() {
        let t0 = TestEnv.now();
        let mut gate = gate();
        gate.login(&pin("1234"), t0).unwrap();

        assert!(!gate.logout(t0).is_empty());
        assert!(gate.logout(t0).is_empty());
        assert_eq!(gate.state(), GateState::Locked);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let verifier = PinVerifier::new(&TestEnv, &pin("1234"));
        let config = GateConfig { countdown_ticks: 2, haptic_at: 2, ..GateConfig::default() };

        let result: Result<Gate<std::time::Instant>, _> = Gate::new(config, verifier);
        assert!(matches!(result, Err(GateError::InvalidConfig { .. })));
    }

    #[test]
    fn unbounded_idle_timeout_is_rejected_before_login() {
        let verifier = PinVerifier::new(&TestEnv, &pin("1234"));
        let config =
            GateConfig { idle_timeout: Duration::from_secs(u64::MAX), ..GateConfig::default() };

        let result: Result<Gate<std::time::Instant>, _> = Gate::new(config, verifier);
        assert!(matches!(result, Err(GateError::InvalidConfig { .. })));
    }

    #[test]
    fn longest_accepted_timeouts_arm_without_overflow() {
        let verifier = PinVerifier::new(&TestEnv, &pin("1234"));
        let config = GateConfig {
            idle_timeout: MAX_IDLE_TIMEOUT,
            countdown_ticks: MAX_COUNTDOWN_TICKS,
            tick_interval: MAX_TICK_INTERVAL,
            haptic_at: 0,
        };
        let mut gate = Gate::new(config, verifier).unwrap();
        let t0 = TestEnv.now();

        gate.login(&pin("1234"), t0).unwrap();
        gate.poll_timers(t0 + MAX_IDLE_TIMEOUT);

        assert_eq!(gate.next_tick(), Some(t0 + MAX_IDLE_TIMEOUT + MAX_TICK_INTERVAL));
    }
}
