use anyhow::{Context, Result};
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use stagehand::cli::commands::{
    ResetCommand, RevertCommand, RunCommand, StatusCommand, ValidateCommand,
};
use stagehand::cli::output::*;
use stagehand::cli::{Cli, Command};
use stagehand::engine::{ControlDecision, EngineError, Orchestrator, RevertTarget};
use stagehand::store::layout::DEFAULT_ROOT;
use stagehand::{CommandExecutor, FsStateStore, PipelineConfig, RunState, Workspace};

// Exit codes: decisions against a non-paused run, unresolvable revert
// targets, and halted pipelines are distinguishable to scripts
const EXIT_INVALID_STATE: i32 = 2;
const EXIT_UNKNOWN_STEP: i32 = 3;
const EXIT_HALTED: i32 = 4;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, &cli).await?,
        Command::Status(cmd) => show_status(cmd, &cli).await?,
        Command::Approve => apply_decision(ControlDecision::Approve, &cli).await?,
        Command::Revise(cmd) => {
            apply_decision(
                ControlDecision::Revise {
                    feedback: cmd.feedback.clone(),
                },
                &cli,
            )
            .await?
        }
        Command::Skip => apply_decision(ControlDecision::Skip, &cli).await?,
        Command::Revert(cmd) => revert_pipeline(cmd, &cli).await?,
        Command::Stop => apply_decision(ControlDecision::Stop, &cli).await?,
        Command::Reset(cmd) => reset_workspace(cmd, &cli).await?,
        Command::Validate(cmd) => validate_pipeline(cmd, &cli)?,
    }

    Ok(())
}

fn workspace_for(cli: &Cli) -> Workspace {
    match &cli.workdir {
        Some(dir) => Workspace::new(dir.as_str()),
        None => Workspace::new(DEFAULT_ROOT),
    }
}

fn build_orchestrator(cli: &Cli) -> Result<Orchestrator<CommandExecutor, FsStateStore>> {
    let config = PipelineConfig::from_file(&cli.file)
        .with_context(|| format!("Failed to load pipeline config from {}", cli.file))?;
    let definition = config.resolve()?;
    let workspace = workspace_for(cli);
    let store = FsStateStore::new(workspace.state_dir());
    let mut orchestrator =
        Orchestrator::new(definition, CommandExecutor::default(), store, workspace);
    orchestrator.add_event_handler(|event| {
        println!("{}", format_pipeline_event(event));
    });
    Ok(orchestrator)
}

/// Map an orchestration result to a process exit, or fall through on success
fn finish(result: std::result::Result<RunState, EngineError>) -> Result<()> {
    match result {
        Ok(RunState::Failed { step, reason }) => {
            println!(
                "\n{} Pipeline {} at step {}: {}",
                CROSS,
                style("halted").red(),
                step,
                reason
            );
            std::process::exit(EXIT_HALTED);
        }
        Ok(RunState::Completed) => {
            println!(
                "\n{} Pipeline completed {}",
                CHECK,
                style("successfully").green()
            );
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(e) => {
            error!("{}", e);
            let code = match &e {
                EngineError::InvalidState { .. } => EXIT_INVALID_STATE,
                EngineError::UnknownStep(_) => EXIT_UNKNOWN_STEP,
                EngineError::Halted { .. } => EXIT_HALTED,
                _ => 1,
            };
            println!("{} {}", CROSS, style(e).red());
            std::process::exit(code);
        }
    }
}

async fn run_pipeline(cmd: &RunCommand, cli: &Cli) -> Result<()> {
    let mut orchestrator = build_orchestrator(cli)?;

    if !cmd.param.is_empty() {
        for (key, value) in &cmd.param {
            println!(
                "{} Parameter override: {} = {}",
                INFO,
                style(key).cyan(),
                style(value).dim()
            );
        }
        let overrides = cmd.param.iter().cloned().collect();
        orchestrator = orchestrator.with_parameters(overrides);
    }

    println!(
        "{} Loaded pipeline: {}",
        INFO,
        style(orchestrator.definition().name()).bold()
    );
    println!();

    finish(orchestrator.run().await)
}

async fn apply_decision(decision: ControlDecision, cli: &Cli) -> Result<()> {
    let orchestrator = build_orchestrator(cli)?;
    finish(orchestrator.apply_decision(decision).await)
}

async fn revert_pipeline(cmd: &RevertCommand, cli: &Cli) -> Result<()> {
    let orchestrator = build_orchestrator(cli)?;
    let target: RevertTarget = cmd.step.parse().unwrap_or_else(|never| match never {});
    finish(
        orchestrator
            .apply_decision(ControlDecision::Revert { target })
            .await,
    )
}

async fn show_status(cmd: &StatusCommand, cli: &Cli) -> Result<()> {
    let orchestrator = build_orchestrator(cli)?;
    let state = match orchestrator.status().await {
        Ok(state) => state,
        Err(e) => return finish(Err(e)),
    };

    match state {
        Some(state) => {
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                let names: Vec<&str> = orchestrator
                    .definition()
                    .steps()
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect();
                print_status(&state, &names);
            }
        }
        None => println!("{} No run in this workspace yet", INFO),
    }
    Ok(())
}

async fn reset_workspace(cmd: &ResetCommand, cli: &Cli) -> Result<()> {
    let orchestrator = build_orchestrator(cli)?;
    let result = if cmd.all {
        orchestrator.reset_all().await
    } else {
        orchestrator.reset_state().await
    };
    match result {
        Ok(removed) => {
            if cmd.all {
                println!(
                    "{} Cleared {} state record(s) and all deliverables",
                    CHECK, removed
                );
            } else {
                println!(
                    "{} Cleared {} state record(s), deliverables kept",
                    CHECK, removed
                );
            }
            Ok(())
        }
        Err(e) => finish(Err(e)),
    }
}

fn validate_pipeline(cmd: &ValidateCommand, cli: &Cli) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    let result = PipelineConfig::from_file(&cli.file).and_then(|c| {
        let definition = c.resolve()?;
        Ok((c, definition))
    });

    match result {
        Ok((config, definition)) => {
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(definition.name()).bold());
            println!("  Steps: {}", style(definition.len()).cyan());
            println!(
                "  Parameters: {}",
                style(definition.parameters().len()).cyan()
            );

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}
