//! # rlm Core
//!
//! Core library for rlm - language-model agents that delegate sub-tasks to
//! recursive instances of themselves.
//!
//! A sub-agent does not call fixed tools. It writes small scripts, runs them
//! in a persistent REPL namespace, reads the output and repeats until it
//! produces a final answer. Scripts can ask nested questions through
//! `llm_query`, which starts another sub-agent one level deeper.

// Core modules
pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod repl;
pub mod tools;
pub mod trajectory;

// Re-export commonly used types
pub use agent::{Agent, AgentBuilder, AgentConfig, AgentCore, SubAgent, SubAgentConfig};
pub use config::{ModelParams, Protocol, ResolvedLlmConfig};
pub use repl::DataStore;
pub use trajectory::TrajectoryRecorder;

/// Current version of the rlm-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for the library
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize tracing with a specific debug mode.
///
/// Logs go to stderr so stdout carries only results.
pub fn init_tracing_with_debug(debug: bool) {
    let filter = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}
