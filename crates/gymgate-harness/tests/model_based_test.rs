//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! gate behaves identically to the reference model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!      ModelGate       RealGate        Compare
//!      (reference)   (virtual time)    Results
//! ```

use std::time::Duration;

use arbitrary::{Arbitrary, Unstructured};
use gymgate_core::{
    Gate, GateAction, GateConfig, GateError, Pin, PinVerifier, Visibility, env::Environment,
};
use gymgate_harness::{
    ModelConfig, ModelGate, ObservableState, Operation, OperationError, OperationResult, SimEnv,
    SimInstant,
};
use proptest::prelude::*;

const PIN: &str = "2468";
const WRONG_PIN: &str = "1357";

/// Real system wrapper that mirrors ModelGate's interface.
struct RealGate {
    gate: Gate<SimInstant>,
    env: SimEnv,
    haptics: usize,
    logouts: usize,
}

impl RealGate {
    fn new(config: GateConfig, seed: u64) -> Self {
        let env = SimEnv::with_seed(seed);
        let verifier = PinVerifier::new(&env, &Pin::parse(PIN).unwrap());
        let gate = Gate::new(config, verifier).unwrap();
        Self { gate, env, haptics: 0, logouts: 0 }
    }

    fn apply(&mut self, op: &Operation) -> OperationResult {
        let now = self.env.now();
        let actions = match *op {
            Operation::Login { correct } => {
                let pin = Pin::parse(if correct { PIN } else { WRONG_PIN }).unwrap();
                match self.gate.login(&pin, now) {
                    Ok(actions) => actions,
                    Err(GateError::InvalidSecret) => {
                        return OperationResult::Error(OperationError::InvalidSecret);
                    },
                    Err(e) => panic!("unexpected login error: {e}"),
                }
            },
            Operation::Logout => self.gate.logout(now),
            Operation::Interact => self.gate.interact(now),
            Operation::CancelCountdown => self.gate.cancel_countdown(now),
            Operation::SetExempt { on } => {
                self.gate.set_exempt(on);
                vec![]
            },
            Operation::Background => self.gate.on_visibility_change(Visibility::Background, now),
            Operation::Foreground => self.gate.on_visibility_change(Visibility::Foreground, now),
            Operation::AdvanceTime { millis } => {
                let now = self.env.advance(Duration::from_millis(u64::from(millis)));
                self.gate.poll_timers(now)
            },
        };

        for action in actions {
            match action {
                GateAction::Haptic => self.haptics += 1,
                GateAction::PersistSession { authenticated: false } => self.logouts += 1,
                _ => {},
            }
        }
        OperationResult::Ok
    }

    fn observable_state(&self) -> ObservableState {
        let millis = |instant: SimInstant| instant.since_start().as_millis() as u64;

        ObservableState {
            authenticated: self.gate.is_authenticated(),
            countdown: self.gate.countdown().map(|c| c.remaining),
            suspended: self.gate.state() == gymgate_core::GateState::Suspended,
            foreground: self.gate.visibility() == Visibility::Foreground,
            exempt_pending: self.gate.is_exempt_pending(),
            idle_deadline_ms: self.gate.idle_deadline().map(millis),
            next_tick_ms: self.gate.next_tick().map(millis),
            haptics: self.haptics,
            logouts: self.logouts,
        }
    }
}

fn config_strategy() -> impl Strategy<Value = (GateConfig, ModelConfig)> {
    (1u64..20, 1u32..6, 200u64..2_000).prop_flat_map(|(idle_secs, ticks, tick_ms)| {
        (0..ticks).prop_map(move |haptic_at| {
            let config = GateConfig {
                idle_timeout: Duration::from_secs(idle_secs),
                countdown_ticks: ticks,
                tick_interval: Duration::from_millis(tick_ms),
                haptic_at,
            };
            let model = ModelConfig { idle_ms: idle_secs * 1_000, ticks, tick_ms, haptic_at };
            (config, model)
        })
    })
}

/// Decode operations from raw bytes via their `Arbitrary` impl.
fn operations_strategy(max_len: usize) -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(any::<u8>(), 0..max_len * 4).prop_map(|bytes| {
        let mut input = Unstructured::new(&bytes);
        let mut ops = Vec::new();
        while !input.is_empty() {
            match Operation::arbitrary(&mut input) {
                Ok(op) => ops.push(op),
                Err(_) => break,
            }
        }
        ops
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_gate_matches_model(
        (config, model_config) in config_strategy(),
        ops in operations_strategy(64),
        seed in any::<u64>(),
    ) {
        let mut real = RealGate::new(config, seed);
        let mut model = ModelGate::new(model_config);

        for (step, op) in ops.iter().enumerate() {
            let expected = model.apply(op);
            let actual = real.apply(op);
            prop_assert_eq!(&actual, &expected, "step {} {:?}", step, op);

            prop_assert_eq!(
                real.observable_state(),
                model.observable_state(),
                "state diverged after step {} {:?}", step, op
            );
        }
    }
}

#[test]
fn exempt_cycle_matches_model() {
    let config = GateConfig {
        idle_timeout: Duration::from_secs(5),
        countdown_ticks: 3,
        tick_interval: Duration::from_secs(1),
        haptic_at: 1,
    };
    let mut real = RealGate::new(config, 7);
    let mut model = ModelGate::new(ModelConfig { idle_ms: 5_000, ticks: 3, tick_ms: 1_000, haptic_at: 1 });

    let ops = [
        Operation::Login { correct: true },
        Operation::SetExempt { on: true },
        Operation::Background,
        Operation::AdvanceTime { millis: 30_000 },
        Operation::Foreground,
        Operation::Background,
        Operation::Foreground,
    ];

    for op in &ops {
        assert_eq!(real.apply(op), model.apply(op));
        assert_eq!(real.observable_state(), model.observable_state(), "after {op:?}");
    }

    // First return was exempt, second was not
    let state = model.observable_state();
    assert!(!state.authenticated);
    assert_eq!(state.logouts, 1);
}

#[test]
fn countdown_runs_to_lock_in_one_advance() {
    let config = GateConfig {
        idle_timeout: Duration::from_secs(10),
        countdown_ticks: 4,
        tick_interval: Duration::from_secs(1),
        haptic_at: 2,
    };
    let mut real = RealGate::new(config, 0);
    let mut model = ModelGate::new(ModelConfig { idle_ms: 10_000, ticks: 4, tick_ms: 1_000, haptic_at: 2 });

    for op in [Operation::Login { correct: true }, Operation::AdvanceTime { millis: 14_000 }] {
        assert_eq!(real.apply(&op), model.apply(&op));
    }

    assert_eq!(real.observable_state(), model.observable_state());
    assert_eq!(real.observable_state().haptics, 1);
    assert!(!real.observable_state().authenticated);
}
