//! stagehand - resumable, gated pipeline runner

pub mod cli;
pub mod core;
pub mod engine;
pub mod executor;
pub mod store;

// Re-export commonly used types
pub use self::core::config::PipelineConfig;
pub use self::core::{Decision, Gate, OnFail, PipelineDefinition, PipelineState, RunState, StepSpec};
pub use self::engine::{ControlDecision, EngineError, Orchestrator, PipelineEvent, RevertTarget};
pub use self::executor::{CommandExecutor, StepExecutor};
pub use self::store::{FsStateStore, StateStore, Workspace};
