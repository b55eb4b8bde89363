//! Trajectory entry structures

use crate::llm::{LlmMessage, Usage};
use crate::tools::{ToolCall, ToolResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single entry in the execution trajectory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryEntry {
    /// Unique identifier for this entry
    pub id: String,

    /// Timestamp when this entry was created
    pub timestamp: DateTime<Utc>,

    /// Type of entry
    pub entry_type: EntryType,

    /// Outer step, or inner turn for delegation entries
    pub step: usize,
}

/// Type of trajectory entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryType {
    /// Task started
    TaskStart {
        task: String,
        agent_config: serde_json::Value,
    },

    /// LLM request sent
    LlmRequest {
        messages: Vec<LlmMessage>,
        model: String,
        provider: String,
        /// Delegation depth, `None` for the outer loop
        depth: Option<usize>,
    },

    /// LLM response received
    LlmResponse {
        message: LlmMessage,
        usage: Option<Usage>,
        finish_reason: Option<String>,
        depth: Option<usize>,
    },

    /// Tool call initiated
    ToolCall { call: ToolCall },

    /// Tool result received
    ToolResult { result: ToolResult },

    /// A sub-agent started
    DelegationStart { task: String, depth: usize },

    /// One fragment ran in a sub-agent namespace
    ReplExecution {
        depth: usize,
        code: String,
        output: String,
        finished: bool,
    },

    /// A sub-agent returned
    DelegationComplete {
        depth: usize,
        turns: usize,
        result: serde_json::Value,
    },

    /// Task completed
    TaskComplete {
        success: bool,
        final_result: String,
        total_steps: usize,
        duration_ms: u64,
    },

    /// Error occurred
    Error {
        error: String,
        context: Option<String>,
    },
}

impl TrajectoryEntry {
    /// Create a new trajectory entry
    pub fn new(entry_type: EntryType, step: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            entry_type,
            step,
        }
    }

    /// Create a task start entry
    pub fn task_start(task: String, agent_config: serde_json::Value) -> Self {
        Self::new(EntryType::TaskStart { task, agent_config }, 0)
    }

    /// Create an LLM request entry
    pub fn llm_request(
        messages: Vec<LlmMessage>,
        model: String,
        provider: String,
        depth: Option<usize>,
        step: usize,
    ) -> Self {
        Self::new(
            EntryType::LlmRequest {
                messages,
                model,
                provider,
                depth,
            },
            step,
        )
    }

    /// Create an LLM response entry
    pub fn llm_response(
        message: LlmMessage,
        usage: Option<Usage>,
        finish_reason: Option<String>,
        depth: Option<usize>,
        step: usize,
    ) -> Self {
        Self::new(
            EntryType::LlmResponse {
                message,
                usage,
                finish_reason,
                depth,
            },
            step,
        )
    }

    /// Create a tool call entry
    pub fn tool_call(call: ToolCall, step: usize) -> Self {
        Self::new(EntryType::ToolCall { call }, step)
    }

    /// Create a tool result entry
    pub fn tool_result(result: ToolResult, step: usize) -> Self {
        Self::new(EntryType::ToolResult { result }, step)
    }

    pub fn delegation_start(task: String, depth: usize) -> Self {
        Self::new(EntryType::DelegationStart { task, depth }, 0)
    }

    pub fn repl_execution(
        depth: usize,
        code: String,
        output: String,
        finished: bool,
        turn: usize,
    ) -> Self {
        Self::new(
            EntryType::ReplExecution {
                depth,
                code,
                output,
                finished,
            },
            turn,
        )
    }

    pub fn delegation_complete(depth: usize, turns: usize, result: serde_json::Value) -> Self {
        Self::new(
            EntryType::DelegationComplete {
                depth,
                turns,
                result,
            },
            turns,
        )
    }

    /// Create a task complete entry
    pub fn task_complete(
        success: bool,
        final_result: String,
        total_steps: usize,
        duration_ms: u64,
    ) -> Self {
        Self::new(
            EntryType::TaskComplete {
                success,
                final_result,
                total_steps,
                duration_ms,
            },
            total_steps,
        )
    }

    /// Create an error entry
    pub fn error(error: String, context: Option<String>, step: usize) -> Self {
        Self::new(EntryType::Error { error, context }, step)
    }
}
