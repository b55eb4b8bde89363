//! OpenAI chat completions client
//!
//! Also serves Azure OpenAI deployments and OpenAI-compatible endpoints.

use crate::config::{Protocol, ResolvedLlmConfig};
use crate::error::{LlmError, Result};
use crate::llm::{
    ChatOptions, ContentBlock, FinishReason, LlmClient, LlmMessage, LlmResponse, MessageRole,
    ToolDefinition, Usage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

const AZURE_API_VERSION: &str = "2024-06-01";

/// OpenAI-compatible chat completions client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    azure: bool,
    headers: HashMap<String, String>,
    defaults: ChatOptions,
}

impl OpenAiClient {
    /// Create a new OpenAI client from resolved LLM config
    pub fn new(config: &ResolvedLlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::Authentication {
                message: "No API key found for OpenAI".to_string(),
            }
            .into());
        }

        Ok(Self {
            client: super::http_client()?,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            azure: config.protocol == Protocol::AzureOpenAI,
            headers: config.headers.clone(),
            defaults: ChatOptions::from(&config.params),
        })
    }

    fn endpoint(&self) -> String {
        if self.azure {
            format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.base_url, self.model, AZURE_API_VERSION
            )
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }

    fn build_request(
        &self,
        messages: &[LlmMessage],
        tools: Option<Vec<ToolDefinition>>,
        options: Option<ChatOptions>,
    ) -> Value {
        let options = options.unwrap_or_default();
        let mut request = json!({
            "model": self.model,
            "messages": convert_messages(messages),
        });

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            request["tools"] = json!(tools);
        }
        if let Some(max_tokens) = options.max_tokens.or(self.defaults.max_tokens) {
            request["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = options.temperature.or(self.defaults.temperature) {
            request["temperature"] = json!(temperature);
        }
        if let Some(top_p) = options.top_p.or(self.defaults.top_p) {
            request["top_p"] = json!(top_p);
        }
        if let Some(stop) = options.stop.or_else(|| self.defaults.stop.clone()) {
            request["stop"] = json!(stop);
        }
        request
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        tools: Option<Vec<ToolDefinition>>,
        options: Option<ChatOptions>,
    ) -> Result<LlmResponse> {
        let request = self.build_request(&messages, tools, options);

        let mut builder = self.client.post(self.endpoint()).json(&request);
        builder = if self.azure {
            builder.header("api-key", &self.api_key)
        } else {
            builder.bearer_auth(&self.api_key)
        };
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }

        let response = builder.send().await.map_err(|e| LlmError::Network {
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status, error_text).into());
        }

        let completion: OpenAiResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::MalformedResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        convert_response(completion)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        if self.azure {
            "azure_openai"
        } else {
            "openai"
        }
    }
}

fn convert_messages(messages: &[LlmMessage]) -> Vec<Value> {
    let mut converted = Vec::with_capacity(messages.len());

    for message in messages {
        match message.role {
            MessageRole::System | MessageRole::User => {
                let role = if message.role == MessageRole::System {
                    "system"
                } else {
                    "user"
                };
                converted.push(json!({
                    "role": role,
                    "content": message.get_text().unwrap_or_default(),
                }));
            }
            MessageRole::Assistant => {
                let tool_calls: Vec<Value> = message
                    .get_tool_uses()
                    .into_iter()
                    .filter_map(|block| match block {
                        ContentBlock::ToolUse { id, name, input } => Some(json!({
                            "id": id,
                            "type": "function",
                            "function": { "name": name, "arguments": input.to_string() },
                        })),
                        _ => None,
                    })
                    .collect();

                let mut assistant = json!({
                    "role": "assistant",
                    "content": message.get_text(),
                });
                if !tool_calls.is_empty() {
                    assistant["tool_calls"] = Value::Array(tool_calls);
                }
                converted.push(assistant);
            }
            MessageRole::Tool => {
                for block in message.blocks() {
                    if let ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        ..
                    } = block
                    {
                        converted.push(json!({
                            "role": "tool",
                            "tool_call_id": tool_use_id,
                            "content": content,
                        }));
                    }
                }
            }
        }
    }

    converted
}

fn convert_response(response: OpenAiResponse) -> Result<LlmResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::MalformedResponse {
            message: "No choices in response".to_string(),
        })?;

    let mut blocks = Vec::new();
    if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
        blocks.push(ContentBlock::Text { text });
    }
    for call in choice.message.tool_calls.unwrap_or_default() {
        // Models occasionally emit invalid JSON arguments; pass them through as a string
        let input = serde_json::from_str(&call.function.arguments)
            .unwrap_or(Value::String(call.function.arguments));
        blocks.push(ContentBlock::ToolUse {
            id: call.id,
            name: call.function.name,
            input,
        });
    }

    let finish_reason = choice.finish_reason.map(|reason| match reason.as_str() {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        "content_filter" => FinishReason::ContentFilter,
        _ => FinishReason::Other(reason),
    });

    Ok(LlmResponse {
        message: LlmMessage::assistant_blocks(blocks),
        usage: response
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens)),
        model: response.model,
        finish_reason,
    })
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assistant_tool_calls_serialize_arguments_as_string() {
        let messages = vec![
            LlmMessage::assistant_blocks(vec![ContentBlock::ToolUse {
                id: "call_1".into(),
                name: "call_sub_rlm".into(),
                input: json!({"task": "find it"}),
            }]),
            LlmMessage::tool_result("call_1", "1234567", false),
        ];

        let converted = convert_messages(&messages);
        assert_eq!(converted.len(), 2);
        assert!(converted[0]["content"].is_null());
        assert_eq!(
            converted[0]["tool_calls"][0]["function"]["arguments"],
            r#"{"task":"find it"}"#
        );
        assert_eq!(converted[1]["role"], "tool");
        assert_eq!(converted[1]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_response_parses_tool_calls() {
        let raw = json!({
            "model": "gpt-4o",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "get_files_info", "arguments": "{\"directory\": \".\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7}
        });
        let response = convert_response(serde_json::from_value(raw).unwrap()).unwrap();

        let uses = response.message.get_tool_uses();
        assert_eq!(uses.len(), 1);
        match uses[0] {
            ContentBlock::ToolUse { input, .. } => assert_eq!(input["directory"], "."),
            other => panic!("unexpected block {:?}", other),
        }
        assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));
    }

    #[test]
    fn test_empty_choices_is_malformed() {
        let raw = json!({"model": "gpt-4o", "choices": []});
        assert!(convert_response(serde_json::from_value(raw).unwrap()).is_err());
    }
}
