//! `call_sub_rlm`: hand a task to a REPL-driven sub-agent

use crate::error::Result;
use crate::impl_tool_factory;
use crate::repl::{render_value, Delegator};
use crate::tools::{Tool, ToolCall, ToolContext, ToolExample, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

const DESCRIPTION: &str = "Call a sub recursive language model to handle complex tasks that \
require decomposition, analysis of large data or files, or multi-step reasoning. The sub-agent \
works in a Python REPL that can read os.environ, open files and use regular expressions. Use \
this when the task is too complex or the data too large to handle directly.";

pub struct CallSubRlmTool {
    delegator: Arc<dyn Delegator>,
}

impl CallSubRlmTool {
    pub fn new(delegator: Arc<dyn Delegator>) -> Self {
        Self { delegator }
    }

    fn from_context(context: &ToolContext) -> Self {
        Self::new(context.delegator.clone())
    }
}

#[async_trait]
impl Tool for CallSubRlmTool {
    fn name(&self) -> &str {
        "call_sub_rlm"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "The task or query to delegate to the sub-agent. Be specific about what you want analyzed or accomplished."
                }
            },
            "required": ["task"]
        })
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let task: String = call.get_parameter("task")?;
        info!(task_chars = task.len(), "Delegating to sub-agent");

        let value = self.delegator.delegate(task, 0).await;
        Ok(ToolResult::success(call.id, render_value(&value)).with_data(value))
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![ToolExample {
            description: "Search bulk data held in the environment".to_string(),
            parameters: json!({
                "task": "Find the magic number hidden in os.environ['HAYSTACK_DATA']"
            }),
            expected_result: "The sub-agent's final answer".to_string(),
        }]
    }
}

impl_tool_factory!(
    CallSubRlmToolFactory,
    CallSubRlmTool,
    "call_sub_rlm",
    "Delegate a task to a sub-agent with a Python REPL"
);
