//! Terminal front desk for the gym session gate.
//!
//! Production implementations of the seams the application layer is generic
//! over:
//!
//! - [`TerminalDriver`]: line commands in, text frames out, tokio timers
//! - [`RedbStore`]: durable settings and session records
//! - [`SystemEnv`]: wall-clock time and OS randomness
//!
//! The `gymgate` binary wires these into a [`gymgate_app::Runtime`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod command;
pub mod driver;
pub mod setup;
pub mod store;
pub mod system_env;

pub use driver::{TerminalDriver, TerminalError};
pub use setup::{Overrides, SetupError};
pub use store::RedbStore;
pub use system_env::SystemEnv;
