//! Core domain models: definition, state, and execution context

pub mod config;
pub mod context;
pub mod pipeline;
pub mod state;

pub use config::{GateConfig, OnFailConfig, PipelineConfig, StepConfig};
pub use context::{PriorStep, StepContext};
pub use pipeline::{Gate, OnFail, PipelineDefinition, StepSpec};
pub use state::{Decision, PipelineState, RetryEntry, RetryOutcome, RunState, StepRecord};
