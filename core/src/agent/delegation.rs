//! The REPL-driven sub-agent and its delegation loop.
//!
//! A delegation seeds a conversation with the task, then alternates model
//! turns with fragment executions until a fragment calls `FINAL`, the model
//! answers without a `repl` block, or the turn budget runs out. Every exit is
//! a value: model faults and infrastructure failures become bracketed
//! messages rather than errors, so a failing nested delegation reads as a
//! string result inside the parent's script.

use super::config::SubAgentConfig;
use super::depth::{depth_exceeded, max_depth_sentinel};
use super::prompt::{resolve_prompt, SUB_AGENT_SYSTEM_PROMPT};
use crate::config::ModelParams;
use crate::error::Result;
use crate::llm::{ChatOptions, Conversation, LlmClient, LlmMessage};
use crate::repl::{extract_repl_code, DataStore, Delegator, EvaluatorFactory, Namespace};
use crate::tools::utils::maybe_truncate;
use crate::trajectory::{TrajectoryEntry, TrajectoryRecorder};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Runs delegations; cloning is cheap and shares the client and factory
#[derive(Clone)]
pub struct SubAgent {
    llm_client: Arc<dyn LlmClient>,
    config: SubAgentConfig,
    factory: Arc<dyn EvaluatorFactory>,
    data: DataStore,
    model_params: ModelParams,
    trajectory_recorder: Option<Arc<TrajectoryRecorder>>,
}

impl SubAgent {
    pub fn new(
        llm_client: Arc<dyn LlmClient>,
        config: SubAgentConfig,
        factory: Arc<dyn EvaluatorFactory>,
    ) -> Self {
        Self {
            llm_client,
            config,
            factory,
            data: DataStore::new(),
            model_params: ModelParams::default(),
            trajectory_recorder: None,
        }
    }

    /// Bulk data exposed to every namespace this agent builds
    pub fn with_data(mut self, data: DataStore) -> Self {
        self.data = data;
        self
    }

    pub fn with_model_params(mut self, params: ModelParams) -> Self {
        self.model_params = params;
        self
    }

    pub fn with_trajectory_recorder(mut self, recorder: Arc<TrajectoryRecorder>) -> Self {
        self.trajectory_recorder = Some(recorder);
        self
    }

    /// Run one delegation of `task` at `depth` and return its result value
    pub async fn run(&self, task: &str, depth: usize) -> Value {
        if depth_exceeded(depth, self.config.max_depth) {
            warn!(depth, max_depth = self.config.max_depth, "Max recursion depth reached");
            return max_depth_sentinel(self.config.max_depth);
        }

        info!(
            depth,
            task_chars = task.len(),
            data_bytes = self.data.total_bytes(),
            "Starting delegation"
        );
        self.record(TrajectoryEntry::delegation_start(task.to_string(), depth))
            .await;

        let (result, turns) = self.drive(task, depth).await;

        info!(depth, turns, "Delegation complete");
        self.record(TrajectoryEntry::delegation_complete(depth, turns, result.clone()))
            .await;
        result
    }

    async fn drive(&self, task: &str, depth: usize) -> (Value, usize) {
        let mut namespace = Namespace::new(
            task,
            Arc::new(self.clone()),
            depth,
            self.config.max_depth,
            self.factory.as_ref(),
            &self.data,
        );
        let mut conversation = Conversation::seeded(task);
        let system_prompt = resolve_prompt(
            self.config.system_prompt.as_deref(),
            SUB_AGENT_SYSTEM_PROMPT,
        );

        for turn in 1..=self.config.max_turns {
            match self
                .turn(&mut namespace, &mut conversation, system_prompt, turn)
                .await
            {
                Ok(Some(result)) => return (result, turn),
                Ok(None) => {}
                Err(e) => {
                    error!(depth, turn, error = %e, "Sub-agent failed");
                    self.record(TrajectoryEntry::error(
                        e.to_string(),
                        Some(format!("Delegation at depth {}", depth)),
                        turn,
                    ))
                    .await;
                    return (Value::String(format!("[Sub-agent error: {}]", e)), turn);
                }
            }
        }

        warn!(depth, max_turns = self.config.max_turns, "Turn budget exhausted");
        (
            Value::String(format!(
                "[Sub-agent produced no final answer after {} turns]",
                self.config.max_turns
            )),
            self.config.max_turns,
        )
    }

    /// One model turn; `Some` ends the delegation with that result
    async fn turn(
        &self,
        namespace: &mut Namespace,
        conversation: &mut Conversation,
        system_prompt: &str,
        turn: usize,
    ) -> Result<Option<Value>> {
        let depth = namespace.depth();
        let messages = conversation.with_system(system_prompt);

        self.record(TrajectoryEntry::llm_request(
            messages.clone(),
            self.llm_client.model_name().to_string(),
            self.llm_client.provider_name().to_string(),
            Some(depth),
            turn,
        ))
        .await;

        let options = ChatOptions::from(&self.model_params);
        let response = self
            .llm_client
            .chat_completion(messages, None, Some(options))
            .await?;

        self.record(TrajectoryEntry::llm_response(
            response.message.clone(),
            response.usage.clone(),
            response.finish_reason.as_ref().map(|r| format!("{:?}", r)),
            Some(depth),
            turn,
        ))
        .await;

        let text = response.text();
        let Some(code) = extract_repl_code(&text) else {
            debug!(depth, turn, "No repl block, taking response as the answer");
            if text.is_empty() {
                return Ok(Some(Value::String(
                    "[No response from sub-agent]".to_string(),
                )));
            }
            return Ok(Some(Value::String(text)));
        };

        info!(depth, turn, code_chars = code.len(), "Executing REPL code");
        let output = namespace.execute(code).await?;
        self.record(TrajectoryEntry::repl_execution(
            depth,
            code.to_string(),
            output.clone(),
            namespace.is_finished(),
            turn,
        ))
        .await;

        if namespace.is_finished() {
            return Ok(Some(namespace.result().cloned().unwrap_or(Value::Null)));
        }

        let shown = if output.is_empty() {
            "(no output)".to_string()
        } else {
            maybe_truncate(&output, self.config.max_output_chars)
        };
        conversation.push(response.message);
        conversation.push(LlmMessage::user(format!("REPL Output:\n{}", shown)));
        Ok(None)
    }

    async fn record(&self, entry: TrajectoryEntry) {
        if let Some(recorder) = &self.trajectory_recorder {
            if let Err(e) = recorder.record(entry).await {
                warn!(error = %e, "Failed to record trajectory entry");
            }
        }
    }
}

#[async_trait]
impl Delegator for SubAgent {
    async fn delegate(&self, task: String, depth: usize) -> Value {
        self.run(&task, depth).await
    }
}
