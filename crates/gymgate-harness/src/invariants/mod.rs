//! Session invariants.
//!
//! Properties of the front desk that hold after every render, whatever
//! sequence of PIN entries, timers and visibility changes led there. For
//! example, the lock screen never shows over an authenticated session.
//!
//! # Architecture
//!
//! The invariant system extracts observable state from the App and its gate
//! into a [`SystemSnapshot`], then runs registered [`Invariant`] checks
//! against it. Violations trigger panics with detailed context for debugging.
//!
//! # Usage
//!
//! ```ignore
//! let snapshot = SystemSnapshot::from_app(runtime.app());
//! InvariantRegistry::standard().assert_all(&snapshot, "after logout");
//! ```

mod checks;
mod snapshot;

pub use checks::{
    AuthenticatedOffLockScreen, BackgroundSuspends, DriverTimersMatchGate,
    KeypadClearedWhenAuthenticated, ModalMirrorsCountdown, TimersMatchState,
};
pub use snapshot::SystemSnapshot;

/// Outcome of one check.
pub type InvariantResult = Result<(), Violation>;

/// A broken session property.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Which check failed, e.g. `timers_match_state`.
    pub invariant: &'static str,
    /// What the snapshot showed.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property of the front desk checked against a [`SystemSnapshot`].
pub trait Invariant: Send + Sync {
    /// Stable snake_case name, used in violation reports.
    fn name(&self) -> &'static str;

    /// `Err` with the offending values if the snapshot breaks the property.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// Ordered set of checks run together.
pub struct InvariantRegistry {
    checks: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// No checks.
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Create a registry with the standard session invariants.
    ///
    /// Includes:
    /// - [`AuthenticatedOffLockScreen`]: no lock screen while authenticated
    /// - [`ModalMirrorsCountdown`]: modal matches the gate's countdown
    /// - [`TimersMatchState`]: timers exist exactly in their states
    /// - [`BackgroundSuspends`]: nothing active in the background
    /// - [`KeypadClearedWhenAuthenticated`]: no PIN digits linger
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(AuthenticatedOffLockScreen);
        registry.add(ModalMirrorsCountdown);
        registry.add(TimersMatchState);
        registry.add(BackgroundSuspends);
        registry.add(KeypadClearedWhenAuthenticated);
        registry
    }

    /// Standard invariants plus [`DriverTimersMatchGate`]. For checks
    /// between steps, once every action has been executed.
    pub fn settled() -> Self {
        let mut registry = Self::standard();
        registry.add(DriverTimersMatchGate);
        registry
    }

    /// Append a check.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.checks.push(Box::new(invariant));
    }

    /// Run every check. Collects all violations rather than stopping at the
    /// first.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.checks.iter().filter_map(|check| check.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Run every check and panic with all violations and `context`.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let report: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("session invariants broken {context}:\n  {}", report.join("\n  "));
        }
    }

    /// Number of checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Whether there are no checks.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}
