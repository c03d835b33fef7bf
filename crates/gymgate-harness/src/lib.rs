//! Deterministic simulation harness for the gym front desk session gate.
//!
//! Virtual-clock implementations of the Environment and Driver traits for
//! deterministic, reproducible testing of lock cycles that take minutes of
//! wall time in production.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and real implementation,
//! and their observable states are compared.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the checks
//! that hold at every render.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod scenario;
pub mod sim_driver;
pub mod sim_env;

pub use invariants::{
    AuthenticatedOffLockScreen, BackgroundSuspends, DriverTimersMatchGate, Invariant,
    InvariantRegistry, InvariantResult, KeypadClearedWhenAuthenticated, ModalMirrorsCountdown,
    SystemSnapshot, TimersMatchState, Violation,
};
pub use model::{
    ModelConfig, ModelGate, ModelPhase, ObservableState, Operation, OperationError,
    OperationResult,
};
pub use scenario::{DEFAULT_PIN, Scenario, ScenarioBuilder};
pub use sim_driver::{RenderedFrame, SimDriver, SimDriverError};
pub use sim_env::{SimEnv, SimInstant};
