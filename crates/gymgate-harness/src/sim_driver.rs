//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the terminal driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`gymgate_app::Runtime`] orchestration code runs in both production and
//! simulation.
//!
//! Input comes from two queues: events injected for immediate delivery, and
//! events injected at a virtual time. When both are empty the driver jumps
//! the clock to the earliest registered timer and delivers its callback, so
//! an unattended session runs to its lock and then the input closes.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::{BTreeMap, VecDeque},
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use gymgate_app::{App, AppEvent, Driver, Handoff, Screen};
use gymgate_core::{TimerKind, TimerToken, env::Environment};

use crate::{
    invariants::{InvariantRegistry, SystemSnapshot},
    sim_env::{SimEnv, SimInstant},
};

/// Error type for simulation driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// What one render showed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFrame {
    /// Virtual time of the render.
    pub at: SimInstant,
    /// Screen shown.
    pub screen: Screen,
    /// Countdown modal ticks, if shown.
    pub countdown: Option<u32>,
    /// Status line, if any.
    pub status: Option<String>,
}

#[derive(Debug)]
struct TimedEvent {
    at: SimInstant,
    seq: u64,
    event: AppEvent,
}

#[derive(Debug)]
struct ArmedTimer {
    kind: TimerKind,
    deadline: SimInstant,
}

/// Shared state for event injection.
///
/// This allows injection from outside async contexts.
#[derive(Debug, Default)]
struct SharedState {
    pending_events: VecDeque<AppEvent>,
    timed_events: Vec<TimedEvent>,
    next_seq: u64,
    timers: BTreeMap<TimerToken, ArmedTimer>,
    frames: Vec<RenderedFrame>,
    haptics: usize,
    launched: Vec<Handoff>,
    schedule_failures: usize,
    fail_renders: bool,
    fail_launches: bool,
    stopped: bool,
}

/// Simulation driver for deterministic testing.
///
/// Clones share the clock and all recorded output, so a test can keep a
/// clone after moving the driver into a [`gymgate_app::Runtime`].
#[derive(Clone)]
pub struct SimDriver {
    env: SimEnv,
    state: Arc<Mutex<SharedState>>,
    invariants: Option<Arc<InvariantRegistry>>,
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new(SimEnv::new())
    }
}

impl SimDriver {
    /// Create a new simulation driver on the clock of `env`.
    pub fn new(env: SimEnv) -> Self {
        Self { env, state: Arc::new(Mutex::new(SharedState::default())), invariants: None }
    }

    /// Enable invariant checking at every render.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(Arc::new(registry));
        self
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().expect("driver state mutex poisoned")
    }

    /// The simulated environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Inject an [`AppEvent`] for immediate processing.
    pub fn inject_event(&self, event: AppEvent) {
        self.lock().pending_events.push_back(event);
    }

    /// Inject several events for immediate processing, in order.
    pub fn inject_events(&self, events: impl IntoIterator<Item = AppEvent>) {
        self.lock().pending_events.extend(events);
    }

    /// Deliver `event` once the virtual clock reaches `delay` from now.
    ///
    /// Events due at the same instant as a timer are delivered first.
    pub fn inject_after(&self, delay: Duration, event: AppEvent) {
        let at = self.env.now() + delay;
        let mut state = self.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.timed_events.push(TimedEvent { at, seq, event });
    }

    /// Make the next `count` timer registrations fail.
    pub fn fail_next_schedules(&self, count: usize) {
        self.lock().schedule_failures = count;
    }

    /// Make every render fail (or succeed again).
    pub fn fail_renders(&self, fail: bool) {
        self.lock().fail_renders = fail;
    }

    /// Make every external launch fail (or succeed again).
    pub fn fail_launches(&self, fail: bool) {
        self.lock().fail_launches = fail;
    }

    /// Timers currently registered, ordered by token.
    pub fn armed_timers(&self) -> Vec<(TimerKind, TimerToken)> {
        self.lock().timers.iter().map(|(token, timer)| (timer.kind, *token)).collect()
    }

    /// Deadline of a registered timer.
    pub fn timer_deadline(&self, token: TimerToken) -> Option<SimInstant> {
        self.lock().timers.get(&token).map(|timer| timer.deadline)
    }

    /// Every frame rendered so far.
    pub fn frames(&self) -> Vec<RenderedFrame> {
        self.lock().frames.clone()
    }

    /// Most recent frame.
    pub fn last_frame(&self) -> Option<RenderedFrame> {
        self.lock().frames.last().cloned()
    }

    /// Number of haptic pulses.
    pub fn haptics(&self) -> usize {
        self.lock().haptics
    }

    /// External flows launched, in order.
    pub fn launched(&self) -> Vec<Handoff> {
        self.lock().launched.clone()
    }

    /// Whether [`Driver::stop`] was called.
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Check if there are events or timers left to deliver.
    pub fn has_pending(&self) -> bool {
        let state = self.lock();
        !state.pending_events.is_empty()
            || !state.timed_events.is_empty()
            || !state.timers.is_empty()
    }

    /// Snapshot of `app` with this driver's timers attached.
    pub fn snapshot(&self, app: &App<SimInstant>) -> SystemSnapshot {
        SystemSnapshot::from_app(app).with_driver_timers(self.armed_timers())
    }

    /// Check invariants against App state.
    pub fn check_invariants(&self, app: &App<SimInstant>, context: &str) {
        if let Some(registry) = &self.invariants {
            registry.assert_all(&SystemSnapshot::from_app(app), context);
        }
    }

    /// Next event due no later than `until`.
    ///
    /// Advances the clock to the event, or to `until` if nothing is due.
    pub fn poll_until(&self, until: SimInstant) -> Option<AppEvent> {
        let event = self.next_event_within(Some(until));
        if event.is_none() {
            self.env.advance_to(until);
        }
        event
    }

    fn next_event(&self) -> Option<AppEvent> {
        self.next_event_within(None)
    }

    /// Next event in virtual time order. Advances the clock as needed.
    fn next_event_within(&self, limit: Option<SimInstant>) -> Option<AppEvent> {
        let mut state = self.lock();

        if let Some(event) = state.pending_events.pop_front() {
            return Some(event);
        }

        let in_range = |at: SimInstant| limit.is_none_or(|limit| at <= limit);

        let timed = state
            .timed_events
            .iter()
            .enumerate()
            .min_by_key(|(_, timed)| (timed.at, timed.seq))
            .map(|(index, timed)| (index, timed.at))
            .filter(|(_, at)| in_range(*at));
        let timer = state
            .timers
            .iter()
            .min_by_key(|(token, timer)| (timer.deadline, **token))
            .map(|(token, timer)| (*token, timer.kind, timer.deadline))
            .filter(|(_, _, deadline)| in_range(*deadline));

        match (timed, timer) {
            (Some((index, at)), timer) if timer.is_none_or(|(_, _, deadline)| at <= deadline) => {
                let timed = state.timed_events.swap_remove(index);
                self.env.advance_to(timed.at);
                Some(timed.event)
            },
            (_, Some((token, kind, deadline))) => {
                state.timers.remove(&token);
                self.env.advance_to(deadline);
                Some(AppEvent::TimerFired { kind, token })
            },
            (_, None) => None,
        }
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = SimInstant;

    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send {
        std::future::ready(Ok(self.next_event()))
    }

    fn now(&self) -> SimInstant {
        self.env.now()
    }

    fn unix_time_secs(&self) -> u64 {
        self.env.wall_clock_secs()
    }

    fn render(&mut self, app: &App<SimInstant>) -> Result<(), Self::Error> {
        self.check_invariants(app, "at render");

        let mut state = self.lock();
        if state.fail_renders {
            return Err(SimDriverError("render surface unavailable".to_string()));
        }

        state.frames.push(RenderedFrame {
            at: self.env.now(),
            screen: app.screen(),
            countdown: app.countdown_modal().map(|modal| modal.remaining),
            status: app.status_message().map(ToString::to_string),
        });
        Ok(())
    }

    fn haptic(&mut self) {
        self.lock().haptics += 1;
    }

    fn schedule_timer(
        &mut self,
        kind: TimerKind,
        token: TimerToken,
        deadline: SimInstant,
    ) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if state.schedule_failures > 0 {
            state.schedule_failures -= 1;
            tracing::debug!(?kind, ?token, "injected scheduling failure");
            return Err(SimDriverError(format!("timer queue full, {kind:?} refused")));
        }

        state.timers.insert(token, ArmedTimer { kind, deadline });
        Ok(())
    }

    fn cancel_timer(&mut self, _kind: TimerKind, token: TimerToken) {
        self.lock().timers.remove(&token);
    }

    fn launch_external(&mut self, handoff: Handoff) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if state.fail_launches {
            tracing::debug!(?handoff, "injected launch failure");
            return Err(SimDriverError(format!("{} unavailable", handoff.label())));
        }

        state.launched.push(handoff);
        Ok(())
    }

    fn stop(&mut self) {
        self.lock().stopped = true;
    }
}
