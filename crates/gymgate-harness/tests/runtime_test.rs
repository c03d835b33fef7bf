//! End-to-end tests of the Runtime on a virtual clock.
//!
//! # Test Strategy
//!
//! Each test scripts what happens at the front desk (PIN typed, app
//! backgrounded, camera launched) into a [`SimDriver`], runs the production
//! [`Runtime`] until its input closes, then checks the App, the driver's
//! recordings and the store.
//!
//! An unlocked session always has a timer pending, so a run with no `Quit`
//! scripted ends with the session locked by its countdown.

use std::time::Duration;

use gymgate_app::{App, AppEvent, Handoff, INCORRECT_PIN, KeyInput, Runtime, Screen};
use gymgate_core::{
    Gate, GateConfig, GateState, Pin, PinVerifier, SettingsStore, TimerKind, TimerToken, Visibility,
    env::Environment,
    store::{ChaoticStore, MemoryStore},
};
use gymgate_harness::{InvariantRegistry, SimDriver, SimEnv, SimInstant};

const PIN: &str = "2468";
const EPOCH: u64 = 1_704_067_200;

fn config() -> GateConfig {
    GateConfig {
        idle_timeout: Duration::from_secs(30),
        countdown_ticks: 5,
        ..GateConfig::default()
    }
}

fn new_app(env: &SimEnv) -> App<SimInstant> {
    let verifier = PinVerifier::new(env, &Pin::parse(PIN).unwrap());
    App::new(Gate::new(config(), verifier).unwrap())
}

/// Driver plus an observer clone, with render-time invariants on.
fn new_driver() -> (SimDriver, SimDriver) {
    let driver = SimDriver::new(SimEnv::with_seed(42)).with_invariants(InvariantRegistry::standard());
    let observer = driver.clone();
    (driver, observer)
}

fn typed(pin: &str) -> Vec<AppEvent> {
    let mut events: Vec<AppEvent> =
        pin.chars().filter_map(KeyInput::from_char).map(AppEvent::Key).collect();
    events.push(AppEvent::Key(KeyInput::Enter));
    events
}

#[tokio::test]
async fn unattended_session_counts_down_and_locks() {
    let (driver, observer) = new_driver();
    let store = MemoryStore::new();
    let app = new_app(driver.env());
    let mut runtime = Runtime::new(driver, app, store.clone());

    observer.inject_events(typed(PIN));
    runtime.run().await.unwrap();

    let app = runtime.app();
    assert!(!app.is_authenticated());
    assert_eq!(app.screen(), Screen::Lock);
    assert_eq!(app.status_message(), Some("Session locked"));
    assert!(observer.is_stopped());

    // 30s idle + 5 ticks of 1s
    assert_eq!(observer.env().now(), SimInstant::from_secs(35));
    assert_eq!(observer.haptics(), 1);
    assert!(observer.armed_timers().is_empty());

    let record = store.load_session().unwrap().unwrap();
    assert!(!record.authenticated);
    assert_eq!(record.changed_at_secs, EPOCH + 35);
    assert_eq!(store.session_writes(), 2);

    // The modal counted 5..1, then the lock screen came one render late
    let countdown: Vec<_> = observer.frames().iter().filter_map(|f| f.countdown).collect();
    assert_eq!(countdown, vec![5, 4, 3, 2, 1]);

    let frames = observer.frames();
    let [.., cleared, lock] = frames.as_slice() else { panic!("too few frames") };
    assert_eq!((cleared.screen, cleared.countdown), (Screen::Dashboard, None));
    assert_eq!(lock.screen, Screen::Lock);
}

#[tokio::test]
async fn wrong_pin_stays_locked() {
    let (driver, observer) = new_driver();
    let app = new_app(driver.env());
    let mut runtime = Runtime::new(driver, app, MemoryStore::new());

    observer.inject_events(typed("1111"));
    runtime.run().await.unwrap();

    assert_eq!(runtime.app().gate().state(), GateState::Locked);
    assert_eq!(runtime.app().status_message(), Some(INCORRECT_PIN));
    assert!(runtime.app().keypad().is_empty());
    assert_eq!(runtime.bridge().store().session_writes(), 0);
}

#[tokio::test]
async fn interaction_pushes_back_the_deadline() {
    let (driver, observer) = new_driver();
    let app = new_app(driver.env());
    let mut runtime = Runtime::new(driver, app, MemoryStore::new());

    observer.inject_events(typed(PIN));
    observer.inject_after(Duration::from_secs(20), AppEvent::Navigate(Screen::Members));
    observer.inject_after(Duration::from_secs(45), AppEvent::Quit);
    runtime.run().await.unwrap();

    let app = runtime.app();
    assert_eq!(app.gate().state(), GateState::Unlocked);
    assert_eq!(app.screen(), Screen::Members);
    assert_eq!(app.gate().idle_deadline(), Some(SimInstant::from_secs(50)));
    assert_eq!(observer.armed_timers().len(), 1);
}

#[tokio::test]
async fn stale_timer_callback_is_ignored() {
    let (driver, observer) = new_driver();
    let app = new_app(driver.env());
    let mut runtime = Runtime::new(driver, app, MemoryStore::new());

    observer.inject_events(typed(PIN));
    observer.inject_after(Duration::from_secs(10), AppEvent::Interaction);
    // Platform delivers the superseded first deadline anyway
    observer.inject_after(Duration::from_secs(31), AppEvent::TimerFired {
        kind: TimerKind::Idle,
        token: TimerToken(1),
    });
    observer.inject_after(Duration::from_secs(32), AppEvent::Quit);
    runtime.run().await.unwrap();

    assert_eq!(runtime.app().gate().state(), GateState::Unlocked);
    assert_eq!(runtime.app().gate().idle_deadline(), Some(SimInstant::from_secs(40)));
    assert!(runtime.app().countdown_modal().is_none());
}

#[tokio::test]
async fn enter_dismisses_countdown() {
    let (driver, observer) = new_driver();
    let app = new_app(driver.env());
    let mut runtime = Runtime::new(driver, app, MemoryStore::new());

    observer.inject_events(typed(PIN));
    observer.inject_after(Duration::from_millis(32_500), AppEvent::Key(KeyInput::Enter));
    observer.inject_after(Duration::from_secs(33), AppEvent::Quit);
    runtime.run().await.unwrap();

    let app = runtime.app();
    assert_eq!(app.gate().state(), GateState::Unlocked);
    assert!(app.countdown_modal().is_none());
    assert_eq!(app.gate().idle_deadline(), Some(SimInstant::from_millis(62_500)));
}

#[tokio::test]
async fn scheduling_failure_disables_idle_protection() {
    let (driver, observer) = new_driver();
    let app = new_app(driver.env());
    let mut runtime = Runtime::new(driver, app, MemoryStore::new());

    observer.fail_next_schedules(1);
    observer.inject_events(typed(PIN));
    runtime.run().await.unwrap();

    // Nothing left to fire, so the input closed with the session still open
    let app = runtime.app();
    assert_eq!(app.gate().state(), GateState::Unlocked);
    assert!(!app.gate().idle_protection_enabled());
    assert_eq!(app.status_message(), Some("Auto-lock unavailable for this session"));
    assert!(observer.armed_timers().is_empty());
}

#[tokio::test]
async fn next_login_restores_idle_protection() {
    let (driver, observer) = new_driver();
    let app = new_app(driver.env());
    let mut runtime = Runtime::new(driver, app, MemoryStore::new());

    observer.fail_next_schedules(1);
    observer.inject_events(typed(PIN));
    observer.inject_after(Duration::from_secs(5), AppEvent::Logout);
    for event in typed(PIN) {
        observer.inject_after(Duration::from_secs(6), event);
    }
    runtime.run().await.unwrap();

    // Second session locked itself: 6s + 30s idle + 5 ticks
    assert!(!runtime.app().is_authenticated());
    assert!(runtime.app().gate().idle_protection_enabled());
    assert_eq!(observer.env().now(), SimInstant::from_secs(41));
}

#[tokio::test]
async fn persistence_failures_are_not_fatal() {
    let (driver, observer) = new_driver();
    let inner = MemoryStore::new();
    let app = new_app(driver.env());
    let mut runtime = Runtime::new(driver, app, ChaoticStore::always_failing(inner.clone()));

    observer.inject_events(typed(PIN));
    runtime.run().await.unwrap();

    assert!(!runtime.app().is_authenticated());
    assert_eq!(runtime.app().screen(), Screen::Lock);
    assert_eq!(runtime.bridge().failures(), 2);
    assert_eq!(inner.load_session().unwrap(), None);
}

#[tokio::test]
async fn render_failures_are_not_fatal() {
    let (driver, observer) = new_driver();
    let app = new_app(driver.env());
    let mut runtime = Runtime::new(driver, app, MemoryStore::new());

    observer.fail_renders(true);
    observer.inject_events(typed(PIN));
    runtime.run().await.unwrap();

    assert!(observer.frames().is_empty());
    assert!(!runtime.app().is_authenticated());
    assert_eq!(runtime.app().screen(), Screen::Lock);
}

#[tokio::test]
async fn foreground_return_requires_pin() {
    let (driver, observer) = new_driver();
    let store = MemoryStore::new();
    let app = new_app(driver.env());
    let mut runtime = Runtime::new(driver, app, store.clone());

    observer.inject_events(typed(PIN));
    observer.inject_after(Duration::from_secs(3), AppEvent::Visibility(Visibility::Background));
    observer.inject_after(Duration::from_secs(4), AppEvent::Visibility(Visibility::Foreground));
    runtime.run().await.unwrap();

    assert!(!runtime.app().is_authenticated());
    assert_eq!(runtime.app().screen(), Screen::Lock);
    assert_eq!(store.load_session().unwrap().unwrap().changed_at_secs, EPOCH + 4);
    assert_eq!(observer.env().now(), SimInstant::from_secs(4));
}

#[tokio::test]
async fn handoff_through_screen_handle_skips_reauthentication() {
    let (driver, observer) = new_driver();
    let app = new_app(driver.env());
    let mut runtime = Runtime::new(driver, app, MemoryStore::new());
    let handle = runtime.handle();

    observer.inject_events(typed(PIN));
    observer.inject_after(Duration::from_secs(5), AppEvent::Quit);
    runtime.run().await.unwrap();
    assert!(runtime.app().is_authenticated());

    // Camera screen asks for the handoff; the platform backgrounds the app
    // for a minute, then brings it back.
    handle.begin_handoff(Handoff::Camera).unwrap();
    observer.inject_after(Duration::from_secs(1), AppEvent::Visibility(Visibility::Background));
    observer.inject_after(Duration::from_secs(60), AppEvent::Visibility(Visibility::Foreground));
    observer.inject_after(Duration::from_secs(61), AppEvent::Quit);
    runtime.run().await.unwrap();

    let app = runtime.app();
    assert_eq!(observer.launched(), vec![Handoff::Camera]);
    assert_eq!(app.gate().state(), GateState::Unlocked);
    assert!(!app.gate().is_exempt_pending());
    assert_eq!(app.gate().idle_deadline(), Some(SimInstant::from_secs(95)));
}

#[tokio::test]
async fn exemption_is_spent_by_one_return() {
    let (driver, observer) = new_driver();
    let app = new_app(driver.env());
    let mut runtime = Runtime::new(driver, app, MemoryStore::new());

    observer.inject_events(typed(PIN));
    observer.inject_after(Duration::from_secs(1), AppEvent::BeginHandoff(Handoff::QrScanner));
    for (secs, visibility) in [
        (2, Visibility::Background),
        (3, Visibility::Foreground),
        (4, Visibility::Background),
        (5, Visibility::Foreground),
    ] {
        observer.inject_after(Duration::from_secs(secs), AppEvent::Visibility(visibility));
    }
    runtime.run().await.unwrap();

    assert!(!runtime.app().is_authenticated());
    assert_eq!(observer.env().now(), SimInstant::from_secs(5));
}

#[tokio::test]
async fn failed_launch_reports_and_keeps_exemption() {
    let (driver, observer) = new_driver();
    let app = new_app(driver.env());
    let mut runtime = Runtime::new(driver, app, MemoryStore::new());

    observer.fail_launches(true);
    observer.inject_events(typed(PIN));
    observer.inject_after(Duration::from_secs(1), AppEvent::BeginHandoff(Handoff::PhotoPicker));
    observer.inject_after(Duration::from_secs(2), AppEvent::Quit);
    runtime.run().await.unwrap();

    let app = runtime.app();
    assert!(observer.launched().is_empty());
    assert_eq!(app.status_message(), Some("Could not open the photo picker"));
    assert!(app.gate().is_exempt_pending());
}

#[tokio::test]
async fn handoff_ignored_on_lock_screen() {
    let (driver, observer) = new_driver();
    let app = new_app(driver.env());
    let mut runtime = Runtime::new(driver, app, MemoryStore::new());
    let handle = runtime.handle();

    handle.begin_handoff(Handoff::Camera).unwrap();
    runtime.run().await.unwrap();

    assert!(observer.launched().is_empty());
    assert!(!runtime.app().gate().is_exempt_pending());
}

#[tokio::test]
async fn handle_reports_stopped_runtime() {
    let (driver, _observer) = new_driver();
    let app = new_app(driver.env());
    let runtime = Runtime::new(driver, app, MemoryStore::new());
    let handle = runtime.handle();
    drop(runtime);

    assert!(handle.logout().is_err());
}
