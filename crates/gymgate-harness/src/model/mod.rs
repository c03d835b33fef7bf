//! Reference model for model-based testing.
//!
//! Operations are applied to both [`ModelGate`] and the real gate, and their
//! observable states are compared after every step.

mod gate;
mod operation;

pub use gate::{ModelConfig, ModelGate, ModelPhase, ObservableState};
pub use operation::{Operation, OperationError, OperationResult};
