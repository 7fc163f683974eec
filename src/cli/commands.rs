//! CLI command definitions

use clap::Args;

/// Run the pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Parameter overrides (key=value)
    #[arg(long, value_parser = parse_key_value)]
    pub param: Vec<(String, String)>,
}

/// Show the current run status
#[derive(Debug, Args, Clone)]
pub struct StatusCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Re-run the paused step with feedback
#[derive(Debug, Args, Clone)]
pub struct ReviseCommand {
    /// Feedback handed to the step's worker on the re-run
    pub feedback: String,
}

/// Rewind to an earlier step
#[derive(Debug, Args, Clone)]
pub struct RevertCommand {
    /// Target step, by 1-based index or exact name
    pub step: String,
}

/// Clear run state
#[derive(Debug, Args, Clone)]
pub struct ResetCommand {
    /// Also delete deliverables
    #[arg(long)]
    pub all: bool,
}

/// Validate a pipeline configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Output the resolved configuration in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
