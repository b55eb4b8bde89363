//! Concrete LLM provider clients

pub mod anthropic;
pub mod google;
pub mod openai;

pub use anthropic::AnthropicClient;
pub use google::GoogleClient;
pub use openai::OpenAiClient;

use crate::config::{Protocol, ResolvedLlmConfig};
use crate::error::{ConfigError, Result};
use crate::llm::LlmClient;
use std::sync::Arc;

/// Create an LLM client for the configured protocol
pub fn create_client(config: &ResolvedLlmConfig) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match &config.protocol {
        Protocol::OpenAICompat | Protocol::AzureOpenAI => Arc::new(OpenAiClient::new(config)?),
        Protocol::Anthropic => Arc::new(AnthropicClient::new(config)?),
        Protocol::GoogleAI => Arc::new(GoogleClient::new(config)?),
        Protocol::Custom(name) => {
            return Err(ConfigError::UnsupportedProtocol {
                protocol: name.clone(),
            }
            .into())
        }
    };
    Ok(client)
}

/// Shared HTTP client construction for all providers
pub(crate) fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?)
}
