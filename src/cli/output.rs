//! CLI output formatting

use crate::core::{Decision, PipelineState, RunState, StepRecord};
use crate::engine::PipelineEvent;
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static PAUSE: Emoji<'_, '_> = Emoji("✋ ", "? ");

/// Format a run status for display
pub fn format_status(status: &RunState) -> String {
    match status {
        RunState::NotStarted => style("NOT STARTED").dim().to_string(),
        RunState::Running => style("RUNNING").yellow().to_string(),
        RunState::Paused { step } => style(format!("PAUSED at step {step}"))
            .blue()
            .to_string(),
        RunState::Completed => style("COMPLETED").green().to_string(),
        RunState::Failed { step, reason } => style(format!("FAILED at step {step}: {reason}"))
            .red()
            .to_string(),
    }
}

/// Format a step record for the status table
pub fn format_step_record(record: &StepRecord, name: &str) -> String {
    let state = match (&record.decision, record.running_since) {
        (Some(Decision::Approved), _) => style("approved").green().to_string(),
        (Some(Decision::Auto), _) => style("auto").green().to_string(),
        (Some(Decision::Revised), _) => style("revised").green().to_string(),
        (Some(Decision::Skipped), _) => style("skipped").dim().to_string(),
        (None, Some(_)) => style("running").yellow().to_string(),
        (None, None) => style("pending").dim().to_string(),
    };

    let mut line = format!("  {:>2}. {} [{}]", record.index, style(name).bold(), state);
    if let Some(summary) = &record.summary {
        line.push_str(&format!(" - {}", style(summary).dim()));
    }
    if record.revisions > 0 {
        line.push_str(&format!(" ({} revisions)", record.revisions));
    }
    line
}

/// Format a pipeline event for display
pub fn format_pipeline_event(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::PipelineStarted { run_id, name } => format!(
            "{} Starting pipeline {} ({})",
            ROCKET,
            style(name).bold(),
            style(&run_id.to_string()[..8]).dim()
        ),
        PipelineEvent::StepStarted { index, name } => {
            format!("{} Step {}: {}", SPINNER, index, style(name).cyan())
        }
        PipelineEvent::StepPassed {
            index,
            name,
            summary,
        } => {
            if summary.is_empty() {
                format!("{} Step {}: {}", CHECK, index, style(name).green())
            } else {
                format!(
                    "{} Step {}: {} - {}",
                    CHECK,
                    index,
                    style(name).green(),
                    style(summary).dim()
                )
            }
        }
        PipelineEvent::AwaitingApproval { index, name } => format!(
            "{} Step {} ({}) awaits approval: run `stagehand approve`, `revise`, `skip`, or `revert`",
            PAUSE,
            index,
            style(name).bold()
        ),
        PipelineEvent::StepRetrying { index, reason } => format!(
            "{} Step {} failed, retrying once: {}",
            WARN,
            index,
            style(reason).dim()
        ),
        PipelineEvent::StepBounced { from, to, reason } => format!(
            "{} Step {} failed, bouncing back to step {}: {}",
            WARN,
            from,
            style(to).cyan(),
            style(reason).dim()
        ),
        PipelineEvent::DecisionApplied { index, decision } => format!(
            "{} Applying {} to step {}",
            INFO,
            style(decision).bold(),
            index
        ),
        PipelineEvent::PipelineFailed { index, reason } => format!(
            "{} Pipeline halted at step {}: {}",
            CROSS,
            index,
            style(reason).red()
        ),
        PipelineEvent::PipelineCompleted => {
            format!("{} Pipeline {}", CHECK, style("completed").green())
        }
    }
}

/// Print the status view for a persisted run
pub fn print_status(state: &PipelineState, step_names: &[&str]) {
    println!(
        "{} Run {} - {}",
        INFO,
        style(&state.run_id.to_string()[..8]).dim(),
        format_status(&state.status)
    );
    for record in &state.steps {
        let name = step_names.get(record.index - 1).copied().unwrap_or("?");
        println!("{}", format_step_record(record, name));
    }
    if !state.retry_log.is_empty() {
        println!(
            "  {} {} retry attempt(s) recorded",
            WARN,
            state.retry_log.len()
        );
    }
}
