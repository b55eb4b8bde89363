//! AgentCore implementation: the outer tool-calling loop

use super::config::AgentConfig;
use super::prompt::{resolve_prompt, OUTER_SYSTEM_PROMPT};
use crate::agent::{Agent, AgentExecution, AgentResult};
use crate::config::ModelParams;
use crate::error::Result;
use crate::llm::{ChatOptions, ContentBlock, Conversation, LlmClient, LlmMessage};
use crate::repl::Delegator;
use crate::tools::{ToolCall, ToolContext, ToolExecutor, ToolRegistry};
use crate::trajectory::{TrajectoryEntry, TrajectoryRecorder};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The outer agent: declares the file tools and `call_sub_rlm` to the model
/// and runs whatever it asks for until it answers in plain text.
pub struct AgentCore {
    config: AgentConfig,
    llm_client: Arc<dyn LlmClient>,
    tool_executor: ToolExecutor,
    model_params: ModelParams,
    trajectory_recorder: Option<Arc<TrajectoryRecorder>>,
    conversation: Conversation,
}

impl AgentCore {
    /// Create an agent with the built-in tools named in `config`
    pub fn new(
        config: AgentConfig,
        llm_client: Arc<dyn LlmClient>,
        delegator: Arc<dyn Delegator>,
        working_dir: PathBuf,
        python_command: String,
    ) -> Self {
        let context = ToolContext {
            working_dir,
            python_command,
            delegator,
        };
        Self::new_with_registry(config, llm_client, &ToolRegistry::default(), &context)
    }

    /// Create an agent with tools from a custom registry
    pub fn new_with_registry(
        config: AgentConfig,
        llm_client: Arc<dyn LlmClient>,
        registry: &ToolRegistry,
        context: &ToolContext,
    ) -> Self {
        let tool_executor = registry.create_executor(&config.tools, context);
        Self {
            config,
            llm_client,
            tool_executor,
            model_params: ModelParams::default(),
            trajectory_recorder: None,
            conversation: Conversation::new(),
        }
    }

    pub fn with_model_params(mut self, params: ModelParams) -> Self {
        self.model_params = params;
        self
    }

    pub fn with_trajectory_recorder(mut self, recorder: Arc<TrajectoryRecorder>) -> Self {
        self.trajectory_recorder = Some(recorder);
        self
    }

    /// Turns of the most recent task, without the system prompt
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Execute a single step; `Some` carries the model's final answer
    async fn execute_step(&mut self, step: usize) -> Result<Option<String>> {
        let system_prompt =
            resolve_prompt(self.config.system_prompt.as_deref(), OUTER_SYSTEM_PROMPT);
        let messages = self.conversation.with_system(system_prompt);

        self.record(TrajectoryEntry::llm_request(
            messages.clone(),
            self.llm_client.model_name().to_string(),
            self.llm_client.provider_name().to_string(),
            None,
            step,
        ))
        .await;

        let tool_definitions = self.tool_executor.get_tool_definitions();
        let tools = (!tool_definitions.is_empty()).then_some(tool_definitions);
        let options = ChatOptions::from(&self.model_params);

        debug!(step, "Requesting model response");
        let response = self
            .llm_client
            .chat_completion(messages, tools, Some(options))
            .await?;

        self.record(TrajectoryEntry::llm_response(
            response.message.clone(),
            response.usage.clone(),
            response.finish_reason.as_ref().map(|r| format!("{:?}", r)),
            None,
            step,
        ))
        .await;

        self.conversation.push(response.message.clone());

        if !response.message.has_tool_use() {
            return Ok(Some(response.text()));
        }

        for block in response.message.get_tool_uses() {
            if let ContentBlock::ToolUse { id, name, input } = block {
                let tool_call = ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    parameters: input.clone(),
                };
                info!(step, tool = %name, "Calling tool");
                self.record(TrajectoryEntry::tool_call(tool_call.clone(), step))
                    .await;

                let tool_result = self.tool_executor.execute(tool_call).await;
                if !tool_result.success {
                    warn!(step, tool = %name, "Tool reported an error");
                }
                self.record(TrajectoryEntry::tool_result(tool_result.clone(), step))
                    .await;

                self.conversation.push(LlmMessage::tool_result(
                    id.clone(),
                    tool_result.content,
                    !tool_result.success,
                ));
            }
        }

        Ok(None)
    }

    async fn record(&self, entry: TrajectoryEntry) {
        if let Some(recorder) = &self.trajectory_recorder {
            if let Err(e) = recorder.record(entry).await {
                warn!(error = %e, "Failed to record trajectory entry");
            }
        }
    }

    async fn finish(&self, execution: AgentExecution) -> AgentExecution {
        self.record(TrajectoryEntry::task_complete(
            execution.success,
            execution.final_result.clone(),
            execution.steps_executed,
            execution.duration_ms,
        ))
        .await;
        execution
    }
}

#[async_trait]
impl Agent for AgentCore {
    async fn execute_task(&mut self, task: &str) -> AgentResult<AgentExecution> {
        let start_time = Instant::now();
        self.conversation = Conversation::seeded(task);

        info!(max_steps = self.config.max_steps, "Starting task");
        self.record(TrajectoryEntry::task_start(
            task.to_string(),
            serde_json::to_value(&self.config).unwrap_or_default(),
        ))
        .await;

        for step in 1..=self.config.max_steps {
            match self.execute_step(step).await {
                Ok(Some(answer)) => {
                    info!(step, "Task answered");
                    let duration = start_time.elapsed().as_millis() as u64;
                    return Ok(self
                        .finish(AgentExecution::success(answer, step, duration))
                        .await);
                }
                Ok(None) => {}
                Err(e) => {
                    error!(step, error = %e, "Model request failed");
                    self.record(TrajectoryEntry::error(
                        e.to_string(),
                        Some(format!("Step {}", step)),
                        step,
                    ))
                    .await;
                    let duration = start_time.elapsed().as_millis() as u64;
                    return Ok(self
                        .finish(AgentExecution::failure(
                            format!("[[error]] {}", e),
                            step,
                            duration,
                        ))
                        .await);
                }
            }
        }

        warn!(max_steps = self.config.max_steps, "Step budget exhausted");
        let duration = start_time.elapsed().as_millis() as u64;
        Ok(self
            .finish(AgentExecution::failure(
                format!("No answer after {} turns", self.config.max_steps),
                self.config.max_steps,
                duration,
            ))
            .await)
    }

    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn agent_type(&self) -> &str {
        "rlm_agent"
    }

    fn set_trajectory_recorder(&mut self, recorder: Arc<TrajectoryRecorder>) {
        self.trajectory_recorder = Some(recorder);
    }

    fn trajectory_recorder(&self) -> Option<&TrajectoryRecorder> {
        self.trajectory_recorder.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{LlmResponse, MessageRole, ToolDefinition};
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned assistant messages and keeps what it was sent
    #[derive(Default)]
    struct MockLlm {
        replies: Mutex<VecDeque<Option<LlmMessage>>>,
        requests: Mutex<Vec<(Vec<LlmMessage>, usize)>>,
    }

    impl MockLlm {
        fn new(replies: Vec<Option<LlmMessage>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl LlmClient for MockLlm {
        async fn chat_completion(
            &self,
            messages: Vec<LlmMessage>,
            tools: Option<Vec<ToolDefinition>>,
            _options: Option<ChatOptions>,
        ) -> Result<LlmResponse> {
            let declared = tools.map(|t| t.len()).unwrap_or(0);
            self.requests.lock().unwrap().push((messages, declared));
            let reply = self.replies.lock().unwrap().pop_front().flatten();
            match reply {
                Some(message) => Ok(LlmResponse {
                    message,
                    usage: None,
                    model: "mock".to_string(),
                    finish_reason: None,
                }),
                None => Err(LlmError::Network {
                    message: "connection reset".to_string(),
                }
                .into()),
            }
        }

        fn model_name(&self) -> &str {
            "mock"
        }

        fn provider_name(&self) -> &str {
            "test"
        }
    }

    struct Recording {
        tasks: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl Delegator for Recording {
        async fn delegate(&self, task: String, depth: usize) -> Value {
            self.tasks.lock().unwrap().push((task, depth));
            json!("found 4242")
        }
    }

    fn tool_use(id: &str, name: &str, input: Value) -> Option<LlmMessage> {
        Some(LlmMessage::assistant_blocks(vec![ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }]))
    }

    fn agent(llm: Arc<MockLlm>, delegator: Arc<Recording>, max_steps: usize) -> AgentCore {
        let config = AgentConfig {
            max_steps,
            ..Default::default()
        };
        AgentCore::new(
            config,
            llm,
            delegator,
            PathBuf::from("."),
            "python3".to_string(),
        )
    }

    fn recording() -> Arc<Recording> {
        Arc::new(Recording {
            tasks: Mutex::default(),
        })
    }

    #[tokio::test]
    async fn test_plain_answer_ends_the_loop() {
        let llm = MockLlm::new(vec![Some(LlmMessage::assistant("Hello there"))]);
        let mut agent = agent(llm.clone(), recording(), 20);

        let execution = agent.execute_task("say hi").await.unwrap();

        assert!(execution.success);
        assert_eq!(execution.final_result, "Hello there");
        assert_eq!(execution.steps_executed, 1);

        let requests = llm.requests.lock().unwrap();
        let (messages, declared) = &requests[0];
        assert_eq!(*declared, 6);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].get_text().unwrap(), "say hi");
    }

    #[tokio::test]
    async fn test_call_sub_rlm_runs_at_depth_zero_and_feeds_back() {
        let llm = MockLlm::new(vec![
            tool_use("call-1", "call_sub_rlm", json!({"task": "find the number"})),
            Some(LlmMessage::assistant("The number is 4242")),
        ]);
        let delegator = recording();
        let mut agent = agent(llm.clone(), delegator.clone(), 20);

        let execution = agent.execute_task("find it").await.unwrap();

        assert!(execution.success);
        assert_eq!(execution.final_result, "The number is 4242");
        assert_eq!(
            delegator.tasks.lock().unwrap().as_slice(),
            &[("find the number".to_string(), 0)]
        );

        let requests = llm.requests.lock().unwrap();
        let (second, _) = &requests[1];
        let fed_back = second.last().unwrap();
        assert_eq!(fed_back.role, MessageRole::Tool);
        assert_eq!(
            fed_back.blocks(),
            &[ContentBlock::ToolResult {
                tool_use_id: "call-1".to_string(),
                is_error: Some(false),
                content: "found 4242".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_tool_failures_are_fed_back_as_errors() {
        let llm = MockLlm::new(vec![
            tool_use("call-1", "get_file_content", json!({})),
            Some(LlmMessage::assistant("I could not read it")),
        ]);
        let mut agent = agent(llm.clone(), recording(), 20);

        let execution = agent.execute_task("read").await.unwrap();
        assert!(execution.success);

        let requests = llm.requests.lock().unwrap();
        match requests[1].0.last().unwrap().blocks() {
            [ContentBlock::ToolResult {
                is_error, content, ..
            }] => {
                assert_eq!(*is_error, Some(true));
                assert!(content.starts_with("Error:"));
            }
            other => panic!("unexpected blocks {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_step_budget_is_a_defined_failure() {
        let llm = MockLlm::new(vec![
            tool_use("a", "get_files_info", json!({})),
            tool_use("b", "get_files_info", json!({})),
            tool_use("c", "get_files_info", json!({})),
        ]);
        let mut agent = agent(llm.clone(), recording(), 2);

        let execution = agent.execute_task("list forever").await.unwrap();

        assert!(!execution.success);
        assert_eq!(execution.final_result, "No answer after 2 turns");
        assert_eq!(llm.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_model_fault_is_tagged() {
        let llm = MockLlm::new(vec![None]);
        let mut agent = agent(llm, recording(), 20);

        let execution = agent.execute_task("anything").await.unwrap();

        assert!(!execution.success);
        assert!(execution.final_result.starts_with("[[error]] "));
        assert!(execution.final_result.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_custom_system_prompt_is_used() {
        let llm = MockLlm::new(vec![Some(LlmMessage::assistant("ok"))]);
        let config = AgentConfig {
            system_prompt: Some("Be brief.".to_string()),
            ..Default::default()
        };
        let mut agent = AgentCore::new(
            config,
            llm.clone(),
            recording(),
            PathBuf::from("."),
            "python3".to_string(),
        );

        agent.execute_task("go").await.unwrap();

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests[0].0[0].get_text().unwrap(), "Be brief.");
    }

    #[tokio::test]
    async fn test_task_is_recorded() {
        let llm = MockLlm::new(vec![Some(LlmMessage::assistant("done"))]);
        let recorder = Arc::new(TrajectoryRecorder::new());
        let mut agent = agent(llm, recording(), 20).with_trajectory_recorder(recorder.clone());

        agent.execute_task("go").await.unwrap();

        let trajectory = recorder.build_trajectory().await;
        assert_eq!(trajectory.metadata.task.as_deref(), Some("go"));
        assert_eq!(trajectory.metadata.success, Some(true));
    }
}
