//! CLI command implementations

pub mod delegate;
pub mod haystack;
pub mod run;
pub mod tools;

pub use delegate::delegate_command;
pub use haystack::haystack_command;
pub use run::run_command;
pub use tools::tools_command;

use crate::config::CliConfigLoader;
use anyhow::{Context, Result};
use rlm_core::{AgentBuilder, DataStore, TrajectoryRecorder};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Settings shared by every command that runs an agent
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub max_steps: Option<usize>,
    pub max_depth: Option<usize>,
    pub max_turns: Option<usize>,
    pub trajectory_file: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl RunOptions {
    /// Load configuration and apply the command-line limits to a builder
    pub async fn builder(&self, loader: &CliConfigLoader, data: DataStore) -> Result<AgentBuilder> {
        let loaded = loader.load().await?;
        info!(
            protocol = loaded.llm.protocol.as_str(),
            model = %loaded.llm.model,
            "Using model"
        );
        if let Some(sub_llm) = &loaded.sub_llm {
            info!(model = %sub_llm.model, "Using separate sub-agent model");
        }

        let mut sub_agent = loaded.sub_agent;
        if let Some(max_depth) = self.max_depth {
            sub_agent.max_depth = max_depth;
        }
        if let Some(max_turns) = self.max_turns {
            sub_agent.max_turns = max_turns;
        }

        let working_dir = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to read the current directory")?,
        };

        let mut builder = AgentBuilder::new(loaded.llm)
            .with_sub_agent_config(sub_agent)
            .with_working_dir(working_dir)
            .with_data(data);
        if let Some(sub_llm) = loaded.sub_llm {
            builder = builder.with_sub_llm_config(sub_llm);
        }
        if let Some(max_steps) = self.max_steps {
            builder = builder.with_max_steps(max_steps);
        }
        if let Some(recorder) = self.trajectory_recorder() {
            builder = builder.with_trajectory_recorder(recorder);
        }
        Ok(builder)
    }

    fn trajectory_recorder(&self) -> Option<Arc<TrajectoryRecorder>> {
        self.trajectory_file.as_ref().map(|path| {
            info!("📊 Trajectory file: {}", path.display());
            Arc::new(TrajectoryRecorder::with_file(path))
        })
    }
}
