//! Scripted sessions on a virtual clock.
//!
//! A [`Scenario`] wires the production [`Runtime`] to a [`SimDriver`] and a
//! [`MemoryStore`], then lets a test drive it step by step: type a PIN, tap
//! around, leave for the camera, wait a few minutes. After every step the
//! settled invariants are checked and a line is added to the transcript.
//!
//! ```ignore
//! let mut scenario = Scenario::builder().idle_timeout(Duration::from_secs(30)).build()?;
//! scenario.type_pin("2468").await;
//! scenario.wait(Duration::from_secs(40)).await;
//! assert!(!scenario.app().is_authenticated());
//! ```

use std::{fmt::Write as _, time::Duration};

use gymgate_app::{App, AppEvent, KeyInput, Runtime};
use gymgate_core::{
    Gate, GateConfig, GateError, Pin, PinVerifier, Visibility, env::Environment,
    store::MemoryStore,
};

use crate::{
    invariants::InvariantRegistry,
    sim_driver::SimDriver,
    sim_env::{SimEnv, SimInstant},
};

/// PIN used when the builder is not given one.
pub const DEFAULT_PIN: &str = "2468";

/// Builder for [`Scenario`].
#[derive(Clone)]
pub struct ScenarioBuilder {
    config: GateConfig,
    pin: String,
    seed: u64,
    store: MemoryStore,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self {
            config: GateConfig::default(),
            pin: DEFAULT_PIN.to_string(),
            seed: 0,
            store: MemoryStore::new(),
        }
    }
}

impl ScenarioBuilder {
    /// Inactivity period before the countdown.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Countdown length in ticks.
    #[must_use]
    pub fn countdown_ticks(mut self, ticks: u32) -> Self {
        self.config.countdown_ticks = ticks;
        self
    }

    /// Remaining-tick count for the haptic pulse.
    #[must_use]
    pub fn haptic_at(mut self, haptic_at: u32) -> Self {
        self.config.haptic_at = haptic_at;
        self
    }

    /// Stored PIN.
    #[must_use]
    pub fn pin(mut self, pin: &str) -> Self {
        self.pin = pin.to_string();
        self
    }

    /// RNG seed for the simulated environment.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Store the runtime persists into.
    #[must_use]
    pub fn store(mut self, store: MemoryStore) -> Self {
        self.store = store;
        self
    }

    /// Build the scenario, starting locked at virtual time zero.
    ///
    /// # Errors
    ///
    /// - `GateError::MalformedSecret` if the PIN is not 4 to 8 digits
    /// - `GateError::InvalidConfig` if the timings cannot drive a lock cycle
    pub fn build(self) -> Result<Scenario, GateError> {
        let env = SimEnv::with_seed(self.seed);
        let verifier = PinVerifier::new(&env, &Pin::parse(&self.pin)?);
        let gate = Gate::new(self.config, verifier)?;

        let driver = SimDriver::new(env).with_invariants(InvariantRegistry::standard());
        let observer = driver.clone();
        let runtime = Runtime::new(driver, App::new(gate), self.store.clone());

        Ok(Scenario {
            runtime,
            driver: observer,
            store: self.store,
            settled: InvariantRegistry::settled(),
            transcript: String::new(),
        })
    }
}

/// A session driven step by step on a virtual clock.
pub struct Scenario {
    runtime: Runtime<SimDriver, MemoryStore>,
    driver: SimDriver,
    store: MemoryStore,
    settled: InvariantRegistry,
    transcript: String,
}

impl Scenario {
    /// Start building a scenario.
    pub fn builder() -> ScenarioBuilder {
        ScenarioBuilder::default()
    }

    /// Deliver one event.
    pub async fn send(&mut self, event: AppEvent) {
        let label = format!("{event:?}");
        self.runtime.dispatch(event).await;
        self.settle(&label);
    }

    /// Type `pin` on the keypad and press Enter.
    pub async fn type_pin(&mut self, pin: &str) {
        for key in pin.chars().filter_map(KeyInput::from_char) {
            self.runtime.dispatch(AppEvent::Key(key)).await;
        }
        self.runtime.dispatch(AppEvent::Key(KeyInput::Enter)).await;
        self.settle(&format!("type {pin}"));
    }

    /// Let `duration` of virtual time pass, delivering every timer that
    /// comes due on the way.
    pub async fn wait(&mut self, duration: Duration) {
        let until = self.driver.env().now() + duration;
        while let Some(event) = self.driver.poll_until(until) {
            self.runtime.dispatch(event).await;
        }
        self.settle(&format!("wait {}s", duration.as_secs_f32()));
    }

    /// Send the app to the background for `away`, then bring it back.
    pub async fn round_trip(&mut self, away: Duration) {
        self.runtime.dispatch(AppEvent::Visibility(Visibility::Background)).await;
        self.driver.env().advance(away);
        self.runtime.dispatch(AppEvent::Visibility(Visibility::Foreground)).await;
        self.settle(&format!("away {}s", away.as_secs_f32()));
    }

    fn settle(&mut self, label: &str) {
        let app = self.runtime.app();
        let snapshot = self.driver.snapshot(app);
        self.settled.assert_all(&snapshot, &format!("after {label}"));

        let at = self.driver.env().now().since_start().as_millis();
        let modal = match app.countdown_modal() {
            Some(modal) => format!(" modal={}", modal.remaining),
            None => String::new(),
        };
        let status = match app.status_message() {
            Some(status) => format!(" \"{status}\""),
            None => String::new(),
        };
        let _ = writeln!(
            self.transcript,
            "{at}ms {label} -> {:?} {:?}{modal}{status}",
            snapshot.state, snapshot.screen
        );
    }

    /// One line per step: time, step, gate state, screen, modal, status.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// The App under test.
    pub fn app(&self) -> &App<SimInstant> {
        self.runtime.app()
    }

    /// The App under test, for settings changes.
    pub fn app_mut(&mut self) -> &mut App<SimInstant> {
        self.runtime.app_mut()
    }

    /// Observer sharing the driver's recordings and failure switches.
    pub fn driver(&self) -> &SimDriver {
        &self.driver
    }

    /// The store the runtime persists into.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// The runtime, for direct access.
    pub fn runtime_mut(&mut self) -> &mut Runtime<SimDriver, MemoryStore> {
        &mut self.runtime
    }
}
