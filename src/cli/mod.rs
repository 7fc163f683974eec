//! Command-line interface

pub mod commands;
pub mod output;

use std::ffi::OsString;

use clap::{Parser, Subcommand};
use commands::{ResetCommand, RevertCommand, ReviseCommand, RunCommand, StatusCommand, ValidateCommand};

/// Resumable, gated pipeline runner
#[derive(Debug, Parser, Clone)]
#[command(name = "stagehand")]
#[command(version = "0.1.0")]
#[command(about = "Run multi-step pipelines with approval gates and durable state", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the pipeline YAML file
    #[arg(short, long, global = true, default_value = "pipeline.yaml")]
    pub file: String,

    /// Workspace directory holding state and deliverables
    #[arg(short, long, global = true)]
    pub workdir: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the pipeline, resuming from durable state if present
    Run(RunCommand),

    /// Show the current run status
    Status(StatusCommand),

    /// Approve the step the pipeline is paused at
    Approve,

    /// Re-run the paused step with feedback
    Revise(ReviseCommand),

    /// Skip the paused step and continue
    Skip,

    /// Rewind to an earlier step, discarding later work
    Revert(RevertCommand),

    /// Leave the paused pipeline as it is and exit
    Stop,

    /// Clear run state (and deliverables with --all)
    Reset(ResetCommand),

    /// Validate a pipeline configuration
    Validate(ValidateCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
