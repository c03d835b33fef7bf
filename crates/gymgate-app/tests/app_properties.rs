//! Property-based tests for App state machine.
//!
//! Tests verify that view-model invariants hold under arbitrary event
//! sequences, with deferred lock navigation completed the way the runtime
//! completes it.

use std::time::{Duration, Instant};

use gymgate_app::{App, AppAction, AppEvent, Handoff, KeyInput, Screen};
use gymgate_core::{Gate, GateConfig, Pin, PinVerifier, Visibility, env::Environment};
use proptest::prelude::*;

const PIN: &str = "9753";

#[derive(Clone)]
struct TestEnv;

impl Environment for TestEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        async {}
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        buffer.fill(11);
    }

    fn wall_clock_secs(&self) -> u64 {
        0
    }
}

fn new_app() -> App<Instant> {
    let config = GateConfig {
        idle_timeout: Duration::from_secs(30),
        countdown_ticks: 5,
        ..GateConfig::default()
    };
    let verifier = PinVerifier::new(&TestEnv, &Pin::parse(PIN).unwrap());
    App::new(Gate::new(config, verifier).unwrap())
}

fn typed_pin() -> Vec<AppEvent> {
    let mut events: Vec<AppEvent> =
        PIN.chars().map(|c| AppEvent::Key(KeyInput::from_char(c).unwrap())).collect();
    events.push(AppEvent::Key(KeyInput::Enter));
    events
}

fn screen_strategy() -> impl Strategy<Value = Screen> {
    prop::sample::select(vec![
        Screen::Lock,
        Screen::Dashboard,
        Screen::Members,
        Screen::Attendance,
        Screen::Sales,
        Screen::Reports,
        Screen::Settings,
    ])
}

/// Generate a burst of events. Typing the correct PIN is one burst so that
/// sessions actually get unlocked.
fn burst_strategy() -> impl Strategy<Value = Vec<AppEvent>> {
    prop_oneof![
        3 => Just(typed_pin()),
        2 => (0u8..10).prop_map(|d| vec![AppEvent::Key(KeyInput::Digit(d))]),
        1 => Just(vec![AppEvent::Key(KeyInput::Enter)]),
        1 => Just(vec![AppEvent::Key(KeyInput::Backspace)]),
        1 => Just(vec![AppEvent::Key(KeyInput::Esc)]),
        3 => Just(vec![AppEvent::Interaction]),
        2 => screen_strategy().prop_map(|s| vec![AppEvent::Navigate(s)]),
        2 => Just(vec![AppEvent::Visibility(Visibility::Background)]),
        2 => Just(vec![AppEvent::Visibility(Visibility::Foreground)]),
        3 => Just(vec![AppEvent::Tick]),
        1 => Just(vec![AppEvent::BeginHandoff(Handoff::Camera)]),
        1 => Just(vec![AppEvent::SetExempt(true)]),
        1 => Just(vec![AppEvent::CancelCountdown]),
        1 => Just(vec![AppEvent::Logout]),
    ]
}

/// Apply an event and complete any deferred lock navigation.
fn step(app: &mut App<Instant>, event: AppEvent, now: Instant) {
    let actions = app.handle(event, now);
    if actions.contains(&AppAction::NavigateToLock) {
        let _ = app.show_lock_screen();
    }
}

proptest! {
    #[test]
    fn prop_view_model_tracks_gate(
        bursts in prop::collection::vec((burst_strategy(), 0u64..20), 0..80)
    ) {
        let mut app = new_app();
        let mut now = Instant::now();

        for (events, advance) in bursts {
            now += Duration::from_secs(advance);
            for event in events {
                step(&mut app, event, now);

                prop_assert_eq!(
                    app.countdown_modal().map(|m| m.remaining),
                    app.gate().countdown().map(|c| c.remaining)
                );
                prop_assert_eq!(app.screen() == Screen::Lock, !app.is_authenticated());
                if app.is_authenticated() {
                    prop_assert!(app.keypad().is_empty());
                }
            }
        }
    }

    #[test]
    fn prop_lock_actions_end_with_navigation(
        bursts in prop::collection::vec((burst_strategy(), 0u64..20), 0..60)
    ) {
        let mut app = new_app();
        let mut now = Instant::now();

        for (events, advance) in bursts {
            now += Duration::from_secs(advance);
            for event in events {
                let was_authenticated = app.is_authenticated();
                let actions = app.handle(event, now);

                if was_authenticated && !app.is_authenticated() {
                    prop_assert_eq!(actions.last(), Some(&AppAction::NavigateToLock));
                    prop_assert!(actions.contains(&AppAction::PersistSession { authenticated: false }), "expected PersistSession");
                    let _ = app.show_lock_screen();
                } else {
                    prop_assert!(!actions.contains(&AppAction::NavigateToLock));
                }
            }
        }
    }
}
