//! Single task execution command

use super::RunOptions;
use crate::config::CliConfigLoader;
use anyhow::Result;
use rlm_core::{Agent, DataStore};
use tracing::info;

/// Execute a single task with the outer agent and print its answer
pub async fn run_command(task: String, loader: CliConfigLoader, options: RunOptions) -> Result<()> {
    info!("Executing task: {}", task);

    let mut agent = options.builder(&loader, DataStore::new()).await?.build()?;
    let execution = agent.execute_task(&task).await?;

    info!(
        steps = execution.steps_executed,
        duration_ms = execution.duration_ms,
        success = execution.success,
        "Task finished"
    );
    println!("{}", execution.final_result);

    if !execution.success {
        std::process::exit(1);
    }
    Ok(())
}
