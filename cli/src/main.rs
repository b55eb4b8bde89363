//! # rlm CLI
//!
//! Command-line interface for rlm - agents that hand large or multi-step
//! work to recursive sub-agents working in a Python REPL.
//!
//! ## Usage
//!
//! - `rlm "task description"` - Run the outer agent on a task
//! - `rlm delegate "task"` - Run the REPL sub-agent directly
//! - `rlm haystack --lines N` - Needle-in-a-haystack benchmark
//! - `rlm tools` - Show available tools

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::{delegate_command, haystack_command, run_command, tools_command, RunOptions};
use config::CliConfigLoader;

/// rlm - recursive language-model agents
#[derive(Parser)]
#[command(name = "rlm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Language-model agents that delegate to recursive REPL sub-agents")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file or directory path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Protocol to use (openai, anthropic, google_ai, azure_openai)
    #[arg(long, global = true)]
    protocol: Option<String>,

    /// API key override
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Base URL override
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Model name override
    #[arg(long, global = true)]
    model: Option<String>,

    /// Model for the REPL sub-agent (defaults to --model)
    #[arg(long, global = true)]
    sub_model: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Working directory for file tools and the interpreter
    #[arg(long, global = true)]
    working_dir: Option<PathBuf>,

    /// Maximum number of outer agent steps
    #[arg(long, global = true)]
    max_steps: Option<usize>,

    /// Maximum delegation depth
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Maximum model turns per delegation
    #[arg(long, global = true)]
    max_turns: Option<usize>,

    /// Output trajectory file
    #[arg(long, global = true)]
    trajectory_file: Option<PathBuf>,

    /// The task to execute
    task: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the REPL sub-agent directly at depth 0
    Delegate {
        /// The task to delegate
        task: String,
    },

    /// Find a magic number hidden in a large generated text
    Haystack {
        /// Number of lines of filler text
        #[arg(long, default_value_t = 1_000_000)]
        lines: usize,
    },

    /// Show available tools
    Tools,
}

/// Build a configuration loader from CLI arguments
fn build_config_loader(cli: &Cli) -> CliConfigLoader {
    let mut loader = CliConfigLoader::new();

    if let Some(config_path) = &cli.config {
        loader = loader.with_config_override(config_path.clone());
    }

    if let Some(protocol) = &cli.protocol {
        loader = loader.with_protocol_override(protocol.clone());
    }

    if let Some(api_key) = &cli.api_key {
        loader = loader.with_api_key_override(api_key.clone());
    }

    if let Some(base_url) = &cli.base_url {
        loader = loader.with_base_url_override(base_url.clone());
    }

    if let Some(model) = &cli.model {
        loader = loader.with_model_override(model.clone());
    }

    if let Some(sub_model) = &cli.sub_model {
        loader = loader.with_sub_model_override(sub_model.clone());
    }

    loader
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    rlm_core::init_tracing_with_debug(cli.verbose);

    let config_loader = build_config_loader(&cli);
    let options = RunOptions {
        max_steps: cli.max_steps,
        max_depth: cli.max_depth,
        max_turns: cli.max_turns,
        trajectory_file: cli.trajectory_file,
        working_dir: cli.working_dir,
    };

    match (cli.task, cli.command) {
        (Some(task), None) => run_command(task, config_loader, options).await,
        // If task is provided with a subcommand, that's an error
        (Some(_), Some(_)) => {
            tracing::error!("Error: Cannot specify both a task and a subcommand");
            std::process::exit(1);
        }
        (None, Some(Commands::Delegate { task })) => {
            delegate_command(task, config_loader, options).await
        }
        (None, Some(Commands::Haystack { lines })) => {
            haystack_command(lines, config_loader, options).await
        }
        (None, Some(Commands::Tools)) => tools_command().await,
        (None, None) => {
            Cli::command().print_help()?;
            std::process::exit(2);
        }
    }
}
