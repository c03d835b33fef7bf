//! Reference model of the session gate.
//!
//! Written directly from the lock rules with plain millisecond arithmetic and
//! no timer tokens, slots or transition table. It is the oracle the real
//! [`gymgate_core::Gate`] is checked against.

use super::operation::{Operation, OperationError, OperationResult};

/// Session phase as the model tracks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPhase {
    /// PIN required.
    Locked,
    /// Unlocked; locks into a countdown at `idle_at`.
    Unlocked {
        /// Idle deadline (ms).
        idle_at: u64,
    },
    /// Countdown running.
    Countdown {
        /// Ticks left.
        remaining: u32,
        /// Next tick (ms).
        tick_at: u64,
    },
    /// Authenticated, in the background.
    Suspended,
}

/// Observable state for oracle comparison.
///
/// This is the subset of model state that can be compared against the real
/// implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Session is authenticated.
    pub authenticated: bool,
    /// Countdown ticks left, if counting.
    pub countdown: Option<u32>,
    /// Session is suspended in the background.
    pub suspended: bool,
    /// App is in the foreground.
    pub foreground: bool,
    /// Handoff exemption pending.
    pub exempt_pending: bool,
    /// Idle deadline (ms since start), if armed.
    pub idle_deadline_ms: Option<u64>,
    /// Next countdown tick (ms since start), if armed.
    pub next_tick_ms: Option<u64>,
    /// Haptic pulses so far.
    pub haptics: usize,
    /// Forced or explicit logouts so far.
    pub logouts: usize,
}

/// Timing parameters for the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelConfig {
    /// Inactivity period (ms).
    pub idle_ms: u64,
    /// Countdown length.
    pub ticks: u32,
    /// Tick length (ms).
    pub tick_ms: u64,
    /// Haptic threshold (0 disables).
    pub haptic_at: u32,
}

/// Model gate - the reference implementation.
#[derive(Debug, Clone)]
pub struct ModelGate {
    config: ModelConfig,
    phase: ModelPhase,
    foreground: bool,
    exempt: bool,
    now_ms: u64,
    haptics: usize,
    logouts: usize,
}

impl ModelGate {
    /// Locked, foreground model at time zero.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            phase: ModelPhase::Locked,
            foreground: true,
            exempt: false,
            now_ms: 0,
            haptics: 0,
            logouts: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> ModelPhase {
        self.phase
    }

    /// Current model time (ms).
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Apply an operation and return the result.
    ///
    /// This is the main entry point for model-based testing.
    /// The result should match the real implementation's result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match *op {
            Operation::Login { correct } => {
                if !correct {
                    return OperationResult::Error(OperationError::InvalidSecret);
                }
                self.login();
            },
            Operation::Logout => {
                if self.phase != ModelPhase::Locked {
                    self.lock();
                }
            },
            Operation::Interact => {
                if let ModelPhase::Unlocked { .. } = self.phase {
                    self.unlock_from(self.now_ms);
                }
            },
            Operation::CancelCountdown => {
                if let ModelPhase::Countdown { .. } = self.phase {
                    self.unlock_from(self.now_ms);
                }
            },
            Operation::SetExempt { on } => self.exempt = on,
            Operation::Background => {
                if self.foreground {
                    self.foreground = false;
                    if matches!(self.phase, ModelPhase::Unlocked { .. } | ModelPhase::Countdown { .. })
                    {
                        self.phase = ModelPhase::Suspended;
                    }
                }
            },
            Operation::Foreground => {
                if !self.foreground {
                    self.foreground = true;
                    // A locked app does not spend the exemption
                    if self.phase == ModelPhase::Suspended {
                        if std::mem::take(&mut self.exempt) {
                            self.unlock_from(self.now_ms);
                        } else {
                            self.lock();
                        }
                    }
                }
            },
            Operation::AdvanceTime { millis } => {
                self.now_ms += u64::from(millis);
                self.run_due_timers();
            },
        }
        OperationResult::Ok
    }

    fn login(&mut self) {
        match self.phase {
            ModelPhase::Locked if !self.foreground => self.phase = ModelPhase::Suspended,
            ModelPhase::Locked | ModelPhase::Unlocked { .. } | ModelPhase::Countdown { .. } => {
                self.unlock_from(self.now_ms);
            },
            ModelPhase::Suspended => {},
        }
    }

    fn unlock_from(&mut self, at: u64) {
        self.phase = ModelPhase::Unlocked { idle_at: at + self.config.idle_ms };
    }

    fn lock(&mut self) {
        self.phase = ModelPhase::Locked;
        self.logouts += 1;
    }

    fn run_due_timers(&mut self) {
        loop {
            match self.phase {
                ModelPhase::Unlocked { idle_at } if idle_at <= self.now_ms => {
                    self.phase = ModelPhase::Countdown {
                        remaining: self.config.ticks,
                        tick_at: idle_at + self.config.tick_ms,
                    };
                },
                ModelPhase::Countdown { remaining, tick_at } if tick_at <= self.now_ms => {
                    let remaining = remaining - 1;
                    if remaining == 0 {
                        self.lock();
                        return;
                    }
                    if remaining == self.config.haptic_at {
                        self.haptics += 1;
                    }
                    self.phase =
                        ModelPhase::Countdown { remaining, tick_at: tick_at + self.config.tick_ms };
                },
                _ => return,
            }
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        let (idle_deadline_ms, next_tick_ms) = match self.phase {
            ModelPhase::Unlocked { idle_at } => (Some(idle_at), None),
            ModelPhase::Countdown { tick_at, .. } => (None, Some(tick_at)),
            ModelPhase::Locked | ModelPhase::Suspended => (None, None),
        };

        ObservableState {
            authenticated: self.phase != ModelPhase::Locked,
            countdown: match self.phase {
                ModelPhase::Countdown { remaining, .. } => Some(remaining),
                _ => None,
            },
            suspended: self.phase == ModelPhase::Suspended,
            foreground: self.foreground,
            exempt_pending: self.exempt,
            idle_deadline_ms,
            next_tick_ms,
            haptics: self.haptics,
            logouts: self.logouts,
        }
    }
}
