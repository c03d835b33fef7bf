//! Platform-agnostic keypad input.

/// Keypad input abstraction.
///
/// Decouples application logic from terminal or touch libraries, enabling
/// deterministic simulation testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Digit key, `0..=9`.
    Digit(u8),
    /// Enter/OK key (submit PIN, dismiss countdown).
    Enter,
    /// Backspace key (delete last digit, back to dashboard).
    Backspace,
    /// Escape key (quit from the lock screen, logout elsewhere).
    Esc,
}

impl KeyInput {
    /// Map a character to a key. `None` for anything but ASCII digits.
    pub fn from_char(c: char) -> Option<Self> {
        c.to_digit(10).map(|d| Self::Digit(d as u8))
    }
}
