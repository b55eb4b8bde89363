//! LLM client abstractions and implementations

pub mod client;
pub mod conversation;
pub mod message;
pub mod providers;

pub use client::{
    ChatOptions, FinishReason, FunctionDefinition, LlmClient, LlmResponse, ToolDefinition, Usage,
};
pub use conversation::Conversation;
pub use message::{ContentBlock, LlmMessage, MessageContent, MessageRole};
pub use providers::*;
