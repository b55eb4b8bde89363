//! Agent configuration structures

use serde::{Deserialize, Serialize};

/// Names of the operations the outer agent declares by default
pub const DEFAULT_TOOLS: [&str; 6] = [
    "get_files_info",
    "get_file_content",
    "run_any_file",
    "write_file",
    "delete_file",
    "call_sub_rlm",
];

/// Configuration for the outer tool-calling agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum number of model turns
    pub max_steps: usize,

    /// List of tools available to this agent
    pub tools: Vec<String>,

    /// Custom system prompt for the agent (optional)
    /// If not provided, the default system prompt will be used
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 20,
            tools: DEFAULT_TOOLS.iter().map(|name| name.to_string()).collect(),
            system_prompt: None,
        }
    }
}

/// Configuration for the REPL-driven sub-agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubAgentConfig {
    /// Deepest delegation that still runs; deeper ones get the sentinel
    pub max_depth: usize,

    /// Model turns per delegation before giving up
    pub max_turns: usize,

    /// REPL output longer than this is truncated before the model sees it
    pub max_output_chars: usize,

    /// Seconds a single read from the interpreter may take
    pub exec_timeout_secs: u64,

    pub python_command: String,

    pub system_prompt: Option<String>,
}

impl Default for SubAgentConfig {
    fn default() -> Self {
        Self {
            max_depth: 1,
            max_turns: 20,
            max_output_chars: 16000,
            exec_timeout_secs: 120,
            python_command: "python3".to_string(),
            system_prompt: None,
        }
    }
}

/// Builder for creating agents with resolved LLM configuration
pub struct AgentBuilder {
    llm_config: crate::config::ResolvedLlmConfig,
    sub_llm_config: Option<crate::config::ResolvedLlmConfig>,
    agent_config: AgentConfig,
    sub_agent_config: SubAgentConfig,
    data: crate::repl::DataStore,
    working_dir: std::path::PathBuf,
    recorder: Option<std::sync::Arc<crate::trajectory::TrajectoryRecorder>>,
}

impl AgentBuilder {
    /// Create a new agent builder with LLM configuration
    pub fn new(llm_config: crate::config::ResolvedLlmConfig) -> Self {
        Self {
            llm_config,
            sub_llm_config: None,
            agent_config: AgentConfig::default(),
            sub_agent_config: SubAgentConfig::default(),
            data: crate::repl::DataStore::new(),
            working_dir: std::path::PathBuf::from("."),
            recorder: None,
        }
    }

    /// Set agent configuration
    pub fn with_agent_config(mut self, agent_config: AgentConfig) -> Self {
        self.agent_config = agent_config;
        self
    }

    /// Set sub-agent configuration
    pub fn with_sub_agent_config(mut self, sub_agent_config: SubAgentConfig) -> Self {
        self.sub_agent_config = sub_agent_config;
        self
    }

    /// Use a different model configuration for the sub-agent
    pub fn with_sub_llm_config(mut self, llm_config: crate::config::ResolvedLlmConfig) -> Self {
        self.sub_llm_config = Some(llm_config);
        self
    }

    /// Set maximum steps
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.agent_config.max_steps = max_steps;
        self
    }

    /// Set tools
    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.agent_config.tools = tools;
        self
    }

    /// Set system prompt
    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.agent_config.system_prompt = system_prompt;
        self
    }

    /// Bulk data handed to every sub-agent namespace
    pub fn with_data(mut self, data: crate::repl::DataStore) -> Self {
        self.data = data;
        self
    }

    /// Root directory for file tools and the interpreter
    pub fn with_working_dir<P: Into<std::path::PathBuf>>(mut self, dir: P) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_trajectory_recorder(
        mut self,
        recorder: std::sync::Arc<crate::trajectory::TrajectoryRecorder>,
    ) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Build the sub-agent alone
    pub fn build_sub_agent(&self) -> crate::error::Result<super::SubAgent> {
        let sub_llm_config = self.sub_llm_config.as_ref().unwrap_or(&self.llm_config);
        let client = crate::llm::create_client(sub_llm_config)?;
        let factory = crate::repl::PythonEvaluatorFactory::new(
            self.sub_agent_config.python_command.clone(),
            std::time::Duration::from_secs(self.sub_agent_config.exec_timeout_secs),
        )
        .with_working_dir(self.working_dir.clone());

        let mut sub_agent = super::SubAgent::new(
            client,
            self.sub_agent_config.clone(),
            std::sync::Arc::new(factory),
        )
        .with_data(self.data.clone())
        .with_model_params(sub_llm_config.params.clone());
        if let Some(recorder) = &self.recorder {
            sub_agent = sub_agent.with_trajectory_recorder(recorder.clone());
        }
        Ok(sub_agent)
    }

    /// Build the outer agent, wired to a sub-agent for `call_sub_rlm`
    pub fn build(self) -> crate::error::Result<super::AgentCore> {
        let sub_agent = self.build_sub_agent()?;
        let client = crate::llm::create_client(&self.llm_config)?;

        let mut agent = super::AgentCore::new(
            self.agent_config,
            client,
            std::sync::Arc::new(sub_agent),
            self.working_dir,
            self.sub_agent_config.python_command,
        )
        .with_model_params(self.llm_config.params);
        if let Some(recorder) = self.recorder {
            agent = agent.with_trajectory_recorder(recorder);
        }
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.max_steps, 20);
        assert_eq!(config.tools.len(), 6);
        assert!(config.tools.contains(&"call_sub_rlm".to_string()));

        let sub = SubAgentConfig::default();
        assert_eq!(sub.max_depth, 1);
        assert_eq!(sub.max_turns, 20);
        assert_eq!(sub.max_output_chars, 16000);
        assert_eq!(sub.exec_timeout_secs, 120);
        assert_eq!(sub.python_command, "python3");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let sub: SubAgentConfig = serde_json::from_str(r#"{"max_depth": 3}"#).unwrap();
        assert_eq!(sub.max_depth, 3);
        assert_eq!(sub.max_turns, 20);

        let agent: AgentConfig = serde_json::from_str(r#"{"max_steps": 5}"#).unwrap();
        assert_eq!(agent.max_steps, 5);
        assert_eq!(agent.tools.len(), 6);
    }
}
