//! Orchestration engine: control loop, gating, retry accounting, revert

pub mod gate;
pub mod orchestrator;
pub mod retry;
pub mod revert;

use thiserror::Error;

use crate::executor::ExecutorError;
use crate::store::StoreError;

pub use gate::{GateEngine, ValidationOutcome};
pub use orchestrator::{ControlDecision, EventHandler, Orchestrator, PipelineEvent};
pub use retry::{FailureAction, RetryCoordinator};
pub use revert::{RevertManager, RevertTarget};

/// Error types for engine operations
///
/// Validation failures are not errors: they feed the failure policy and,
/// when the recovery budget runs out, end up in `RunState::Failed` with the
/// step and the accumulated reasons.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Control operation attempted in the wrong run state
    #[error("{operation} is not valid while the pipeline is {state}")]
    InvalidState { operation: String, state: String },

    /// Revert target resolves to zero or multiple steps
    #[error("no unique step matches revert target '{0}'")]
    UnknownStep(String),

    /// Pipeline already halted by an exhausted recovery budget
    #[error("pipeline halted at step {step}: {reason}")]
    Halted { step: usize, reason: String },

    /// The external executor itself errored
    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),

    /// Durable storage failed
    #[error(transparent)]
    Store(#[from] StoreError),
}
