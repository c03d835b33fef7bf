//! Application layer for the gym front desk app
//!
//! Pure state machines and generic runtime around the session gate, enabling
//! deterministic simulation testing with the same code that runs in
//! production.
//!
//! # Components
//!
//! - [`App`]: UI state machine (lock screen keypad, navigation, countdown
//!   modal, handoff convention)
//! - [`SessionBridge`]: best-effort persistence of session records
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver
//! - [`ScreenHandle`]: Channel-based access to the App from other tasks

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod bridge;
mod driver;
mod event;
mod handle;
mod input;
mod runtime;
mod state;

pub use action::AppAction;
pub use app::{App, INCORRECT_PIN, MALFORMED_PIN};
pub use bridge::SessionBridge;
pub use driver::Driver;
pub use event::AppEvent;
pub use handle::{RuntimeStopped, ScreenHandle};
pub use input::KeyInput;
pub use runtime::{Runtime, RuntimeError};
pub use state::{CountdownModal, Handoff, Keypad, Screen};
