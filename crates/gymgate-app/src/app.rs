//! Application state machine.
//!
//! This module defines the [`App`] state machine, which wraps the session
//! [`Gate`] with everything a front desk UI needs around it: the lock screen
//! keypad, screen navigation, the countdown modal and the external handoff
//! convention.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Turns keypad input into PIN submissions and reports wrong PINs.
//! - Counts any input on an authenticated screen as user interaction.
//! - Mirrors the gate's countdown into a modal view model.
//! - Registers the handoff exemption before launching the camera, photo
//!   picker or QR scanner. Screens never clear it.

use std::{
    fmt::Debug,
    ops::{Add, Sub},
    time::Duration,
};

use gymgate_core::{Gate, GateAction, GateError, Pin};

use crate::{AppAction, AppEvent, CountdownModal, Handoff, KeyInput, Keypad, Screen};

/// Shown after a PIN mismatch.
pub const INCORRECT_PIN: &str = "Incorrect PIN";

/// Status shown for entries too short or too long to be a PIN.
pub const MALFORMED_PIN: &str = "PIN must be 4 to 8 digits";

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App<I> {
    /// Session gate. Sole authority on authentication.
    gate: Gate<I>,
    /// Screen currently shown.
    screen: Screen,
    /// Lock screen PIN entry.
    keypad: Keypad,
    /// Countdown modal. `None` when hidden.
    modal: Option<CountdownModal>,
    /// Transient status message. `None` if no message.
    status_message: Option<String>,
}

impl<I> App<I>
where
    I: Copy + Ord + Debug + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    /// Create an App on the lock screen.
    pub fn new(gate: Gate<I>) -> Self {
        Self {
            gate,
            screen: Screen::Lock,
            keypad: Keypad::default(),
            modal: None,
            status_message: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent, now: I) -> Vec<AppAction<I>> {
        match event {
            AppEvent::Key(key) => self.handle_key(key, now),
            AppEvent::Interaction => {
                if self.screen == Screen::Lock {
                    return vec![];
                }
                let actions = self.gate.interact(now);
                self.absorb(actions)
            },
            AppEvent::Navigate(screen) => self.navigate(screen, now),
            AppEvent::Visibility(visibility) => {
                let actions = self.gate.on_visibility_change(visibility, now);
                self.absorb(actions)
            },
            AppEvent::TimerFired { kind, token } => {
                let actions = self.gate.on_timer(kind, token, now);
                self.absorb(actions)
            },
            AppEvent::Tick => {
                let actions = self.gate.poll_timers(now);
                self.absorb(actions)
            },
            AppEvent::BeginHandoff(handoff) => self.begin_handoff(handoff, now),
            AppEvent::SetExempt(on) => {
                self.gate.set_exempt(on);
                vec![]
            },
            AppEvent::CancelCountdown => {
                let actions = self.gate.cancel_countdown(now);
                self.absorb(actions)
            },
            AppEvent::Logout => {
                let actions = self.gate.logout(now);
                self.absorb(actions)
            },
            AppEvent::Quit => vec![AppAction::Quit],
        }
    }

    /// Launch an external capture flow.
    ///
    /// Registers the exemption first, then asks the runtime to launch the
    /// flow. Ignored on the lock screen and while the countdown is showing.
    pub fn begin_handoff(&mut self, handoff: Handoff, now: I) -> Vec<AppAction<I>> {
        if !self.accepts_screen_input() {
            tracing::debug!(?handoff, screen = ?self.screen, "handoff ignored");
            return vec![];
        }

        let actions = self.gate.interact(now);
        let mut out = self.absorb(actions);
        self.gate.set_exempt(true);
        out.push(AppAction::LaunchExternal(handoff));
        out
    }

    /// The platform could not start `handoff`.
    ///
    /// The exemption stays registered and is consumed by the next foreground
    /// return.
    pub fn handoff_failed(&mut self, handoff: Handoff) -> Vec<AppAction<I>> {
        self.status_message = Some(format!("Could not open the {}", handoff.label()));
        vec![AppAction::Render]
    }

    /// Turn off idle protection after a scheduling failure.
    pub fn disable_idle_protection(&mut self, error: &GateError) -> Vec<AppAction<I>> {
        let actions = self.gate.disable_idle_protection(error);
        let mut out = self.absorb(actions);
        self.status_message = Some("Auto-lock unavailable for this session".to_string());
        if !out.iter().any(|a| matches!(a, AppAction::Render)) {
            out.push(AppAction::Render);
        }
        out
    }

    /// Complete a deferred navigation to the lock screen.
    ///
    /// Does nothing if the session was re-authenticated in the meantime.
    pub fn show_lock_screen(&mut self) -> Vec<AppAction<I>> {
        if self.gate.is_authenticated() {
            tracing::debug!("lock navigation dropped, session is authenticated");
            return vec![];
        }

        self.screen = Screen::Lock;
        self.keypad.clear();
        vec![AppAction::Render]
    }

    fn handle_key(&mut self, key: KeyInput, now: I) -> Vec<AppAction<I>> {
        if self.screen == Screen::Lock {
            return self.handle_lock_key(key, now);
        }

        // Modal is up: only the dismiss keys do anything
        if self.gate.countdown().is_some() {
            return match key {
                KeyInput::Enter | KeyInput::Esc => {
                    let actions = self.gate.cancel_countdown(now);
                    self.absorb(actions)
                },
                KeyInput::Digit(_) | KeyInput::Backspace => vec![],
            };
        }

        match key {
            KeyInput::Digit(d) => match Screen::from_shortcut(d) {
                Some(screen) => self.navigate(screen, now),
                None => {
                    let actions = self.gate.interact(now);
                    self.absorb(actions)
                },
            },
            KeyInput::Enter => {
                let actions = self.gate.interact(now);
                self.absorb(actions)
            },
            KeyInput::Backspace => self.navigate(Screen::Dashboard, now),
            KeyInput::Esc => {
                let actions = self.gate.logout(now);
                self.absorb(actions)
            },
        }
    }

    fn handle_lock_key(&mut self, key: KeyInput, now: I) -> Vec<AppAction<I>> {
        match key {
            KeyInput::Digit(d) => {
                if self.keypad.push(d) {
                    self.status_message = None;
                } else {
                    self.keypad.clear();
                    self.status_message = Some(MALFORMED_PIN.to_string());
                }
                vec![AppAction::Render]
            },
            KeyInput::Backspace => {
                self.keypad.pop();
                vec![AppAction::Render]
            },
            KeyInput::Enter => self.submit_pin(now),
            KeyInput::Esc => vec![AppAction::Quit],
        }
    }

    fn submit_pin(&mut self, now: I) -> Vec<AppAction<I>> {
        let entered = self.keypad.take();
        if entered.is_empty() {
            return vec![];
        }

        let pin = match Pin::parse(&entered) {
            Ok(pin) => pin,
            Err(e) => {
                tracing::debug!(%e, "malformed PIN entry");
                self.status_message = Some(MALFORMED_PIN.to_string());
                return vec![AppAction::Render];
            },
        };

        match self.gate.login(&pin, now) {
            Ok(actions) => {
                self.screen = Screen::Dashboard;
                self.status_message = None;
                let mut out = self.absorb(actions);
                out.push(AppAction::Render);
                out
            },
            Err(_) => {
                self.status_message = Some(INCORRECT_PIN.to_string());
                vec![AppAction::Render]
            },
        }
    }

    fn navigate(&mut self, screen: Screen, now: I) -> Vec<AppAction<I>> {
        if screen == Screen::Lock || !self.accepts_screen_input() {
            tracing::debug!(?screen, from = ?self.screen, "navigation ignored");
            return vec![];
        }

        self.screen = screen;
        let actions = self.gate.interact(now);
        let mut out = self.absorb(actions);
        out.push(AppAction::Render);
        out
    }

    /// Authenticated, past the lock screen, and no modal in the way.
    fn accepts_screen_input(&self) -> bool {
        self.screen != Screen::Lock
            && self.gate.is_authenticated()
            && self.gate.countdown().is_none()
    }

    /// Apply gate actions to the view model and forward the rest.
    ///
    /// View changes collapse into a single trailing [`AppAction::Render`].
    /// [`AppAction::NavigateToLock`] stays last.
    fn absorb(&mut self, actions: Vec<GateAction<I>>) -> Vec<AppAction<I>> {
        let mut out = Vec::with_capacity(actions.len() + 1);
        let mut render = false;
        let mut navigate = false;

        for action in actions {
            match action {
                GateAction::ArmTimer { kind, token, deadline } => {
                    out.push(AppAction::ArmTimer { kind, token, deadline });
                },
                GateAction::CancelTimer { kind, token } => {
                    out.push(AppAction::CancelTimer { kind, token });
                },
                GateAction::ShowCountdown { remaining } => {
                    let total = self.gate.config().countdown_ticks;
                    self.modal = Some(CountdownModal { remaining, total });
                    render = true;
                },
                GateAction::UpdateCountdown { remaining } => {
                    if let Some(modal) = self.modal.as_mut() {
                        modal.remaining = remaining;
                    }
                    render = true;
                },
                GateAction::HideCountdown => {
                    self.modal = None;
                    render = true;
                },
                GateAction::Haptic => out.push(AppAction::Haptic),
                GateAction::SessionCleared => {
                    self.keypad.clear();
                    self.status_message = Some("Session locked".to_string());
                    render = true;
                },
                GateAction::PersistSession { authenticated } => {
                    out.push(AppAction::PersistSession { authenticated });
                },
                GateAction::NavigateToLock => navigate = true,
            }
        }

        if render {
            out.push(AppAction::Render);
        }
        if navigate {
            out.push(AppAction::NavigateToLock);
        }
        out
    }

    /// Session gate.
    pub fn gate(&self) -> &Gate<I> {
        &self.gate
    }

    /// Whether the session is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.gate.is_authenticated()
    }

    /// Screen currently shown.
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Lock screen PIN entry.
    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    /// Countdown modal. `None` when hidden.
    pub fn countdown_modal(&self) -> Option<&CountdownModal> {
        self.modal.as_ref()
    }

    /// Transient status message. `None` if no message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}
