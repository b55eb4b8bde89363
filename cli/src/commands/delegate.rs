//! Run the REPL sub-agent directly

use super::RunOptions;
use crate::config::CliConfigLoader;
use anyhow::Result;
use rlm_core::repl::render_value;
use rlm_core::DataStore;
use tracing::info;

/// Delegate `task` at depth 0 and print the result value
pub async fn delegate_command(
    task: String,
    loader: CliConfigLoader,
    options: RunOptions,
) -> Result<()> {
    info!("Delegating task: {}", task);

    let sub_agent = options
        .builder(&loader, DataStore::new())
        .await?
        .build_sub_agent()?;
    let result = sub_agent.run(&task, 0).await;

    println!("{}", render_value(&result));
    Ok(())
}
