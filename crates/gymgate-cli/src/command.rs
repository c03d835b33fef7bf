//! Line commands for the terminal front desk.
//!
//! Each line typed at the prompt becomes zero or more [`AppEvent`]s. A line of
//! digits is keyed in and submitted, so `2468` unlocks and `4` jumps to the
//! fourth screen.

use gymgate_app::{AppEvent, Handoff, KeyInput, Screen};
use gymgate_core::Visibility;

/// Help text printed for unknown commands.
pub const HELP: &str = "\
commands:
  <digits>            key in digits and press Enter (PIN, or screen shortcut 1-6)
  <empty line>        interaction (pushes back the idle deadline)
  enter | stay        Enter key (dismisses the countdown)
  del                 Backspace
  esc                 Escape (logout, or quit from the lock screen)
  go <screen>         switch screens (dashboard, members, attendance, sales, reports, settings)
  camera | photo | qr open a capture flow
  back                return from a capture flow
  bg | fg             background or foreground the app
  logout              end the session
  quit                exit";

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Events to feed the app, in order.
    Events(Vec<AppEvent>),
    /// Return from an external flow.
    Back,
    /// Unrecognized input.
    Unknown(String),
}

/// Parse one input line.
pub fn parse(line: &str) -> Command {
    let line = line.trim();
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Command::Events(vec![AppEvent::Interaction]);
    };

    if head.chars().all(|c| c.is_ascii_digit()) {
        let mut events: Vec<AppEvent> =
            head.chars().filter_map(KeyInput::from_char).map(AppEvent::Key).collect();
        events.push(AppEvent::Key(KeyInput::Enter));
        return Command::Events(events);
    }

    let event = match head.to_ascii_lowercase().as_str() {
        "enter" => AppEvent::Key(KeyInput::Enter),
        "stay" => AppEvent::CancelCountdown,
        "del" => AppEvent::Key(KeyInput::Backspace),
        "esc" => AppEvent::Key(KeyInput::Esc),
        "camera" => AppEvent::BeginHandoff(Handoff::Camera),
        "photo" => AppEvent::BeginHandoff(Handoff::PhotoPicker),
        "qr" => AppEvent::BeginHandoff(Handoff::QrScanner),
        "bg" => AppEvent::Visibility(Visibility::Background),
        "fg" => AppEvent::Visibility(Visibility::Foreground),
        "logout" => AppEvent::Logout,
        "quit" | "exit" => AppEvent::Quit,
        "back" => return Command::Back,
        "go" => match words.next().and_then(screen_named) {
            Some(screen) => AppEvent::Navigate(screen),
            None => return Command::Unknown(line.to_string()),
        },
        _ => return Command::Unknown(line.to_string()),
    };

    Command::Events(vec![event])
}

fn screen_named(name: &str) -> Option<Screen> {
    Screen::AUTHENTICATED.into_iter().find(|screen| screen.title().eq_ignore_ascii_case(name))
}
