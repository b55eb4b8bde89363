//! Agent execution result structures

use serde::{Deserialize, Serialize};

/// Result of agent execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecution {
    /// Whether the model produced an answer
    pub success: bool,

    /// The answer, or what went wrong
    pub final_result: String,

    /// Number of steps executed
    pub steps_executed: usize,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl AgentExecution {
    /// Create a successful execution result
    pub fn success(final_result: String, steps_executed: usize, duration_ms: u64) -> Self {
        Self {
            success: true,
            final_result,
            steps_executed,
            duration_ms,
        }
    }

    /// Create a failed execution result
    pub fn failure(reason: String, steps_executed: usize, duration_ms: u64) -> Self {
        Self {
            success: false,
            final_result: reason,
            steps_executed,
            duration_ms,
        }
    }
}
