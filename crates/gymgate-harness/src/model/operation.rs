//! Session operations for model-based testing.
//!
//! Operations represent everything that can happen to a session. They are
//! generated randomly by proptest and applied to both the model and the real
//! gate.

use arbitrary::Arbitrary;

/// One thing that can happen at the front desk.
///
/// Decoded from raw bytes via `Arbitrary`, so the fuzz targets and the
/// property tests share the same vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Submit a PIN.
    Login {
        /// Whether the submitted PIN is the stored one.
        correct: bool,
    },

    /// Explicit logout.
    Logout,

    /// Qualifying user interaction.
    Interact,

    /// Dismiss the warning countdown.
    CancelCountdown,

    /// Register or withdraw the handoff exemption.
    SetExempt {
        /// New flag value.
        on: bool,
    },

    /// App moved to the background.
    Background,

    /// App returned to the foreground.
    Foreground,

    /// Let virtual time pass, firing every timer that comes due in deadline
    /// order.
    AdvanceTime {
        /// How far to move the clock, in ms.
        millis: u16,
    },
}

/// What the gate said to an operation. Model and real gate must agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Accepted, including operations that changed nothing.
    Ok,

    /// Rejected.
    Error(OperationError),
}

/// Rejections the model knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Submitted PIN does not match.
    InvalidSecret,
}

impl OperationResult {
    /// Accepted.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Rejected.
    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }
}
