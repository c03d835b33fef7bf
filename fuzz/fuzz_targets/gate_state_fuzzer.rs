//! Fuzz target for the session gate state machine
//!
//! # Strategy
//!
//! - Small configs: idle timeouts and tick intervals of a few hundred ms so
//!   time advances cross many deadlines
//! - Operations: login (right and wrong PIN), logout, interaction, countdown
//!   dismissal, exemptions, visibility changes, time advances
//!
//! # Invariants
//!
//! - Authenticated iff not Locked
//! - Idle deadline armed iff Unlocked (with idle protection on)
//! - Tick armed iff the countdown is running, remaining within 1..=ticks
//! - Authenticated in the background means Suspended
//! - Timer tokens strictly increase; cancellations name the armed token
//! - A forced logout ends with `PersistSession { false }` then
//!   `NavigateToLock`

#![no_main]

use std::{collections::HashMap, time::Duration};

use arbitrary::Arbitrary;
use gymgate_core::{
    env::Environment, Gate, GateAction, GateConfig, GateState, Pin, PinVerifier, TimerKind,
    TimerToken, Visibility,
};
use gymgate_harness::{Operation, SimEnv, SimInstant};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    idle_ms: u16,
    ticks: u8,
    tick_ms: u16,
    haptic_at: u8,
    ops: Vec<Operation>,
}

fuzz_target!(|input: Input| {
    let ticks = u32::from(input.ticks % 8) + 1;
    let config = GateConfig {
        idle_timeout: Duration::from_millis(u64::from(input.idle_ms % 2_000) + 1),
        countdown_ticks: ticks,
        tick_interval: Duration::from_millis(u64::from(input.tick_ms % 500) + 1),
        haptic_at: u32::from(input.haptic_at) % ticks,
    };

    let env = SimEnv::with_seed(0);
    let verifier = PinVerifier::new(&env, &Pin::parse("2468").unwrap());
    let mut gate = Gate::new(config.clone(), verifier).unwrap();

    let mut last_token = TimerToken(0);
    let mut armed: HashMap<TimerKind, TimerToken> = HashMap::new();

    for op in input.ops {
        let now = env.now();
        let actions = match op {
            Operation::Login { correct } => {
                let pin = Pin::parse(if correct { "2468" } else { "1357" }).unwrap();
                match gate.login(&pin, now) {
                    Ok(actions) => actions,
                    Err(_) => {
                        assert!(!correct, "correct PIN rejected");
                        vec![]
                    }
                }
            }
            Operation::Logout => gate.logout(now),
            Operation::Interact => gate.interact(now),
            Operation::CancelCountdown => gate.cancel_countdown(now),
            Operation::SetExempt { on } => {
                gate.set_exempt(on);
                vec![]
            }
            Operation::Background => gate.on_visibility_change(Visibility::Background, now),
            Operation::Foreground => gate.on_visibility_change(Visibility::Foreground, now),
            Operation::AdvanceTime { millis } => {
                let now = env.advance(Duration::from_millis(u64::from(millis)));
                gate.poll_timers(now)
            }
        };

        check_actions(&actions, &mut last_token, &mut armed);
        check_state(&gate, &config);
    }
});

fn check_actions(
    actions: &[GateAction<SimInstant>],
    last_token: &mut TimerToken,
    armed: &mut HashMap<TimerKind, TimerToken>,
) {
    for action in actions {
        match action {
            GateAction::ArmTimer { kind, token, .. } => {
                assert!(*token > *last_token, "token {token:?} not above {last_token:?}");
                *last_token = *token;
                armed.insert(*kind, *token);
            }
            GateAction::CancelTimer { kind, token } => {
                assert_eq!(armed.remove(kind), Some(*token), "cancelled a timer that was not armed");
            }
            _ => {}
        }
    }

    if let Some(index) = actions.iter().position(|a| *a == GateAction::NavigateToLock) {
        assert_eq!(index, actions.len() - 1, "NavigateToLock not last: {actions:?}");
        assert!(index > 0);
        assert_eq!(actions[index - 1], GateAction::PersistSession { authenticated: false });
    }
}

fn check_state(gate: &Gate<SimInstant>, config: &GateConfig) {
    let state = gate.state();
    assert_eq!(gate.is_authenticated(), state != GateState::Locked);

    match state {
        GateState::Unlocked => {
            assert_eq!(gate.idle_deadline().is_some(), gate.idle_protection_enabled());
            assert!(gate.countdown().is_none());
        }
        GateState::WarningCountdown { remaining } => {
            assert!((1..=config.countdown_ticks).contains(&remaining));
            let view = gate.countdown().unwrap();
            assert_eq!(view.remaining, remaining);
            assert_eq!(view.total, config.countdown_ticks);
            assert!(gate.idle_deadline().is_none());
            assert!(gate.next_tick().is_some());
        }
        GateState::Locked | GateState::Suspended => {
            assert!(gate.idle_deadline().is_none());
            assert!(gate.next_tick().is_none());
        }
    }

    if gate.is_authenticated() && gate.visibility() == Visibility::Background {
        assert_eq!(state, GateState::Suspended);
    }
}
