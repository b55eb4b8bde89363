//! Tool system and built-in tools

pub mod base;
pub mod builtin;
pub mod registry;
pub mod utils;

pub use base::{Tool, ToolCall, ToolExample, ToolExecutor, ToolResult};
pub use registry::{ToolContext, ToolFactory, ToolRegistry};
