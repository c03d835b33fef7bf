//! Fuzz target for the App state machine
//!
//! Feeds arbitrary input events through the App and executes its actions the
//! way the runtime does, with platform failures injected on demand.
//!
//! # Strategy
//!
//! - Events: keypad, navigation, visibility, ticks, handoffs, countdown
//!   dismissal, logout
//! - Failures: timers refused by the platform, capture flows that cannot
//!   launch
//!
//! # Invariants
//!
//! The standard invariant set after every event: never authenticated on the
//! lock screen, modal mirrors the countdown, timers match the state,
//! authenticated background means Suspended, keypad empty once unlocked.

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use gymgate_app::{App, AppAction, AppEvent, Handoff, KeyInput, Screen};
use gymgate_core::{env::Environment, Gate, GateConfig, GateError, Pin, PinVerifier, Visibility};
use gymgate_harness::{InvariantRegistry, SimEnv, SimInstant, SystemSnapshot};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Input {
    Digit(u8),
    Enter,
    Backspace,
    Interaction,
    Shortcut(u8),
    Background,
    Foreground,
    Advance(u16),
    Handoff(HandoffChoice),
    SetExempt(bool),
    CancelCountdown,
    Logout,
    FailNextTimer,
    FailNextLaunch,
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum HandoffChoice {
    Camera,
    PhotoPicker,
    QrScanner,
}

#[derive(Default)]
struct Faults {
    timer: bool,
    launch: bool,
}

fuzz_target!(|inputs: Vec<Input>| {
    let config = GateConfig {
        idle_timeout: Duration::from_secs(3),
        countdown_ticks: 3,
        tick_interval: Duration::from_secs(1),
        haptic_at: 1,
    };
    let env = SimEnv::with_seed(0);
    let verifier = PinVerifier::new(&env, &Pin::parse("2468").unwrap());
    let mut app = App::new(Gate::new(config, verifier).unwrap());
    let invariants = InvariantRegistry::standard();
    let mut faults = Faults::default();

    for input in inputs {
        let event = match input {
            Input::Digit(d) => AppEvent::Key(KeyInput::Digit(d % 10)),
            Input::Enter => AppEvent::Key(KeyInput::Enter),
            Input::Backspace => AppEvent::Key(KeyInput::Backspace),
            Input::Interaction => AppEvent::Interaction,
            Input::Shortcut(n) => match Screen::from_shortcut(n % 7 + 1) {
                Some(screen) => AppEvent::Navigate(screen),
                None => AppEvent::Navigate(Screen::Lock),
            },
            Input::Background => AppEvent::Visibility(Visibility::Background),
            Input::Foreground => AppEvent::Visibility(Visibility::Foreground),
            Input::Advance(millis) => {
                env.advance(Duration::from_millis(u64::from(millis)));
                AppEvent::Tick
            }
            Input::Handoff(choice) => AppEvent::BeginHandoff(match choice {
                HandoffChoice::Camera => Handoff::Camera,
                HandoffChoice::PhotoPicker => Handoff::PhotoPicker,
                HandoffChoice::QrScanner => Handoff::QrScanner,
            }),
            Input::SetExempt(on) => AppEvent::SetExempt(on),
            Input::CancelCountdown => AppEvent::CancelCountdown,
            Input::Logout => AppEvent::Logout,
            Input::FailNextTimer => {
                faults.timer = true;
                continue;
            }
            Input::FailNextLaunch => {
                faults.launch = true;
                continue;
            }
        };

        let actions = app.handle(event, env.now());
        execute(&mut app, actions, &mut faults);

        let snapshot = SystemSnapshot::from_app(&app);
        invariants.assert_all(&snapshot, &format!("after {input:?}"));
    }
});

fn execute(app: &mut App<SimInstant>, actions: Vec<AppAction<SimInstant>>, faults: &mut Faults) {
    let mut pending = actions;

    while !pending.is_empty() {
        for action in std::mem::take(&mut pending) {
            match action {
                AppAction::ArmTimer { kind, .. } if faults.timer => {
                    faults.timer = false;
                    let error =
                        GateError::SchedulingFailure { kind, reason: "refused".to_string() };
                    pending.extend(app.disable_idle_protection(&error));
                }
                AppAction::LaunchExternal(handoff) if faults.launch => {
                    faults.launch = false;
                    pending.extend(app.handoff_failed(handoff));
                }
                AppAction::NavigateToLock => pending.extend(app.show_lock_screen()),
                _ => {}
            }
        }
    }
}
