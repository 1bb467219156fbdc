//! `relay trigger` — manual workflow dispatch for a stage.
//!
//! Same dispatcher the webhook path uses, driven from the command line.

use anyhow::Result;

use relay::config::RelayConfig;
use relay::dispatch::{DispatchResult, Dispatcher, WorkflowDispatcher};
use relay::stage::StageId;

pub async fn cmd_trigger(
    config: &RelayConfig,
    stage: &str,
    project: Option<&str>,
    previous: Option<&str>,
) -> Result<()> {
    let stage: StageId = stage.parse()?;
    let previous = previous.map(|p| p.parse::<StageId>()).transpose()?;
    let project = project.unwrap_or(&config.project_name);

    let dispatcher =
        WorkflowDispatcher::new(config.github_owner.clone(), config.github_token.clone());

    match dispatcher.trigger(project, stage, previous).await {
        DispatchResult::Ok => {
            println!("Workflow dispatch accepted for {} ({})", stage, project);
            Ok(())
        }
        DispatchResult::Failed { reason } => {
            anyhow::bail!("Dispatch failed: {}", reason)
        }
    }
}
