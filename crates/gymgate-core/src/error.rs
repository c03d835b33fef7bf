//! Error types for the session gate.
//!
//! Only [`GateError::InvalidSecret`] is an expected, frequent outcome and is
//! returned to the lock screen as a typed result. Scheduling and persistence
//! failures are reported to the runtime, which logs them and carries on: they
//! may disable a feature but never the process.

use thiserror::Error;

use crate::{store::StoreError, timer::TimerKind};

/// Errors produced by gate operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Entered PIN does not match the stored digest.
    #[error("invalid secret")]
    InvalidSecret,

    /// Entered PIN is not a well-formed PIN (length or characters).
    #[error("malformed secret: {reason}")]
    MalformedSecret {
        /// What is wrong with the input
        reason: &'static str,
    },

    /// Gate configuration cannot drive a sensible lock cycle.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Which constraint was violated
        reason: &'static str,
    },

    /// The platform refused to register a timer callback.
    ///
    /// Idle protection is disabled for the rest of the session.
    #[error("failed to schedule {kind:?} timer: {reason}")]
    SchedulingFailure {
        /// Timer that could not be registered
        kind: TimerKind,
        /// Platform error description
        reason: String,
    },

    /// Settings or session record could not be persisted or loaded.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl GateError {
    /// Returns true if the caller can simply retry or re-prompt.
    ///
    /// A wrong or malformed PIN is recoverable (clear input, show error). A
    /// scheduling failure disables idle protection until the next login, and a
    /// bad configuration needs fixing before the gate can run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidSecret | Self::MalformedSecret { .. } | Self::Persistence(_))
    }
}
