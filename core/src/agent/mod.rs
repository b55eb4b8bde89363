//! Agent core logic and execution engine

pub mod base;
pub mod config;
pub mod core;
pub mod delegation;
pub mod depth;
pub mod execution;
pub mod prompt;

pub use base::{Agent, AgentResult};
pub use config::{AgentBuilder, AgentConfig, SubAgentConfig, DEFAULT_TOOLS};
pub use core::AgentCore;
pub use delegation::SubAgent;
pub use depth::{depth_exceeded, max_depth_sentinel};
pub use execution::AgentExecution;
pub use prompt::{OUTER_SYSTEM_PROMPT, SUB_AGENT_SYSTEM_PROMPT};
