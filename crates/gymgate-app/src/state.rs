//! Observable application state types.
//!
//! This module defines the data structures the UI renders from: the current
//! [`Screen`], the lock screen [`Keypad`] and the [`CountdownModal`]. They are
//! the "View Model" of the application and carry no gate logic.

use gymgate_core::pin::MAX_PIN_LEN;
use zeroize::Zeroizing;

/// Top-level screens of the front desk app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    /// PIN entry.
    Lock,
    /// Overview of today's activity.
    Dashboard,
    /// Member list and profiles (photo capture lives here).
    Members,
    /// Check-ins (QR scanning lives here).
    Attendance,
    /// Point of sale.
    Sales,
    /// Revenue and attendance reports.
    Reports,
    /// App settings.
    Settings,
}

impl Screen {
    /// Screens reachable after unlocking, in shortcut order.
    pub const AUTHENTICATED: [Screen; 6] = [
        Screen::Dashboard,
        Screen::Members,
        Screen::Attendance,
        Screen::Sales,
        Screen::Reports,
        Screen::Settings,
    ];

    /// Screen for shortcut digit `1..=6`.
    pub fn from_shortcut(digit: u8) -> Option<Self> {
        let index = usize::from(digit).checked_sub(1)?;
        Self::AUTHENTICATED.get(index).copied()
    }

    /// Display title.
    pub fn title(self) -> &'static str {
        match self {
            Self::Lock => "Locked",
            Self::Dashboard => "Dashboard",
            Self::Members => "Members",
            Self::Attendance => "Attendance",
            Self::Sales => "Sales",
            Self::Reports => "Reports",
            Self::Settings => "Settings",
        }
    }
}

/// External flows that put the app in the background on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handoff {
    /// Take a member photo.
    Camera,
    /// Pick an existing photo.
    PhotoPicker,
    /// Scan a member's check-in code.
    QrScanner,
}

impl Handoff {
    /// Human-readable name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::PhotoPicker => "photo picker",
            Self::QrScanner => "QR scanner",
        }
    }
}

/// PIN entry buffer. Wiped on clear and on drop.
#[derive(Clone, Default)]
pub struct Keypad {
    digits: Zeroizing<String>,
}

impl std::fmt::Debug for Keypad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypad").field("len", &self.digits.len()).finish()
    }
}

impl Keypad {
    /// Append a digit.
    ///
    /// Returns `false` if the buffer already holds the longest PIN. The digit
    /// is not appended.
    pub fn push(&mut self, digit: u8) -> bool {
        if self.digits.len() >= MAX_PIN_LEN {
            return false;
        }
        if digit <= 9 {
            self.digits.push(char::from(b'0' + digit));
        }
        true
    }

    /// Remove the last digit.
    pub fn pop(&mut self) {
        self.digits.pop();
    }

    /// Number of digits entered. The digits themselves are never exposed for
    /// display.
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    /// Whether nothing has been entered.
    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// Take the entered digits, leaving the buffer empty.
    pub(crate) fn take(&mut self) -> Zeroizing<String> {
        std::mem::take(&mut self.digits)
    }

    /// Wipe the buffer.
    pub fn clear(&mut self) {
        self.digits = Zeroizing::default();
    }
}

/// "Time's up" modal shown during the warning countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownModal {
    /// Ticks left before the lock.
    pub remaining: u32,
    /// Ticks the countdown started with.
    pub total: u32,
}

impl CountdownModal {
    /// Text shown in the modal.
    pub fn message(&self) -> String {
        format!("Time's up! Locking in {}s. Press Enter to stay signed in.", self.remaining)
    }
}
