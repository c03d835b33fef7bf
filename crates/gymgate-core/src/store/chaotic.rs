//! Chaotic store wrapper for fault injection testing
//!
//! Store wrapper that randomly fails operations to test that persistence
//! failures stay non-fatal for the session gate.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use super::{GateSettings, SessionRecord, SettingsStore, StoreError};

/// Chaotic store wrapper that randomly injects failures
///
/// Delegates to an underlying store but fails operations based on a
/// configured failure rate. Uses Arc<Mutex<>> for the RNG state, making it
/// Clone and thread-safe.
#[derive(Clone)]
pub struct ChaoticStore<S: SettingsStore> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    /// Number of injected failures
    failures: Arc<AtomicUsize>,
}

/// Simple deterministic RNG for chaos injection
///
/// Linear congruential generator: fast, and reproducible with the same seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate next random value [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: SettingsStore> ChaoticStore<S> {
    /// Create with an explicit seed for reproducible chaos
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wrapper that fails every operation.
    pub fn always_failing(inner: S) -> Self {
        Self::with_seed(inner, 1.0, 0)
    }

    /// Underlying store (for checking state after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of failures injected so far.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    fn maybe_fail(&self, operation: &str) -> Result<(), StoreError> {
        #[allow(clippy::expect_used)]
        let roll = self.rng.lock().expect("ChaoticRng mutex poisoned").next();

        if roll < self.failure_rate {
            self.failures.fetch_add(1, Ordering::Relaxed);
            return Err(StoreError::Io(format!("injected failure: {operation}")));
        }
        Ok(())
    }
}

impl<S: SettingsStore> SettingsStore for ChaoticStore<S> {
    fn load_settings(&self) -> Result<Option<GateSettings>, StoreError> {
        self.maybe_fail("load_settings")?;
        self.inner.load_settings()
    }

    fn save_settings(&self, settings: &GateSettings) -> Result<(), StoreError> {
        self.maybe_fail("save_settings")?;
        self.inner.save_settings(settings)
    }

    fn load_session(&self) -> Result<Option<SessionRecord>, StoreError> {
        self.maybe_fail("load_session")?;
        self.inner.load_session()
    }

    fn save_session(&self, record: &SessionRecord) -> Result<(), StoreError> {
        self.maybe_fail("save_session")?;
        self.inner.save_session(record)
    }
}
