//! Session gate core for the gym front desk app.
//!
//! Pure, I/O-free state machines that decide when the app must demand the
//! access PIN again: after an idle timeout, and whenever the app returns to
//! the foreground, except for one return following a registered camera or
//! photo-picker handoff.
//!
//! # Components
//!
//! - [`Gate`]: authentication gate, idle deadline, warning countdown and the
//!   visibility monitor, driven by explicit transitions
//! - [`ExemptionRegistry`]: single pending handoff exemption, consumed at most
//!   once by the visibility monitor
//! - [`PinVerifier`]: salted, constant-time PIN comparison
//! - [`SettingsStore`]: synchronous persistence abstraction (best-effort for
//!   session records)
//! - [`env::Environment`]: time and randomness, real or simulated

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
pub mod env;
pub mod error;
pub mod exemption;
pub mod gate;
pub mod pin;
pub mod store;
pub mod timer;
pub mod transition;
pub mod visibility;

pub use action::GateAction;
pub use error::GateError;
pub use exemption::ExemptionRegistry;
pub use gate::{CountdownView, Gate, GateConfig, GateState};
pub use pin::{Pin, PinDigest, PinVerifier};
pub use store::{GateSettings, SessionRecord, SettingsStore, StoreError};
pub use timer::{TimerKind, TimerToken};
pub use visibility::Visibility;
