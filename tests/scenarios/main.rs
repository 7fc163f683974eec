//! Scenario-based tests for stagehand

mod helpers;

mod approval_flow;
mod reset_flow;
mod retry_ceiling;
mod revert_flow;
