//! Google Gemini client (`generateContent`)

use crate::config::ResolvedLlmConfig;
use crate::error::{LlmError, Result};
use crate::llm::{
    ChatOptions, ContentBlock, FinishReason, LlmClient, LlmMessage, LlmResponse, MessageContent,
    MessageRole, ToolDefinition, Usage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Gemini client
pub struct GoogleClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    headers: HashMap<String, String>,
    defaults: ChatOptions,
}

impl GoogleClient {
    pub fn new(config: &ResolvedLlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::Authentication {
                message: "No API key found for Google AI".to_string(),
            }
            .into());
        }

        Ok(Self {
            client: super::http_client()?,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            headers: config.headers.clone(),
            defaults: ChatOptions::from(&config.params),
        })
    }

    fn build_request(
        &self,
        messages: &[LlmMessage],
        tools: Option<Vec<ToolDefinition>>,
        options: Option<ChatOptions>,
    ) -> Value {
        let options = options.unwrap_or_default();
        let (system, contents) = convert_messages(messages);

        let mut request = json!({ "contents": contents });
        if let Some(system) = system {
            request["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            let declarations: Vec<Value> = tools
                .into_iter()
                .map(|tool| {
                    json!({
                        "name": tool.function.name,
                        "description": tool.function.description,
                        "parameters": tool.function.parameters,
                    })
                })
                .collect();
            request["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        let mut generation = serde_json::Map::new();
        if let Some(max_tokens) = options.max_tokens.or(self.defaults.max_tokens) {
            generation.insert("maxOutputTokens".into(), json!(max_tokens));
        }
        if let Some(temperature) = options.temperature.or(self.defaults.temperature) {
            generation.insert("temperature".into(), json!(temperature));
        }
        if let Some(top_p) = options.top_p.or(self.defaults.top_p) {
            generation.insert("topP".into(), json!(top_p));
        }
        if let Some(stop) = options.stop.or_else(|| self.defaults.stop.clone()) {
            generation.insert("stopSequences".into(), json!(stop));
        }
        if !generation.is_empty() {
            request["generationConfig"] = Value::Object(generation);
        }
        request
    }
}

#[async_trait]
impl LlmClient for GoogleClient {
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        tools: Option<Vec<ToolDefinition>>,
        options: Option<ChatOptions>,
    ) -> Result<LlmResponse> {
        let request = self.build_request(&messages, tools, options);

        let mut builder = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&request);
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

        let generated: GeminiResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::MalformedResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        convert_response(generated, &self.model)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "google"
    }
}

/// Convert turns into Gemini `contents`.
///
/// Gemini answers a function call by name, not by id, so names are looked up
/// from the tool uses seen earlier in the conversation.
fn convert_messages(messages: &[LlmMessage]) -> (Option<String>, Vec<Value>) {
    let mut system_parts = Vec::new();
    let mut contents: Vec<Value> = Vec::new();
    let mut call_names: HashMap<&str, &str> = HashMap::new();
    let mut pending_responses: Vec<Value> = Vec::new();

    for message in messages {
        if message.role != MessageRole::Tool && !pending_responses.is_empty() {
            contents.push(json!({ "role": "user", "parts": std::mem::take(&mut pending_responses) }));
        }

        match message.role {
            MessageRole::System => {
                if let Some(text) = message.get_text() {
                    system_parts.push(text);
                }
            }
            MessageRole::User => {
                contents.push(json!({
                    "role": "user",
                    "parts": [{ "text": message.get_text().unwrap_or_default() }],
                }));
            }
            MessageRole::Assistant => {
                let parts: Vec<Value> = match &message.content {
                    MessageContent::Text(text) => vec![json!({ "text": text })],
                    MessageContent::Blocks(blocks) => blocks
                        .iter()
                        .filter_map(|block| match block {
                            ContentBlock::Text { text } => Some(json!({ "text": text })),
                            ContentBlock::ToolUse { id, name, input } => {
                                call_names.insert(id.as_str(), name.as_str());
                                Some(json!({ "functionCall": { "name": name, "args": input } }))
                            }
                            ContentBlock::ToolResult { .. } => None,
                        })
                        .collect(),
                };
                contents.push(json!({ "role": "model", "parts": parts }));
            }
            MessageRole::Tool => {
                for block in message.blocks() {
                    if let ContentBlock::ToolResult {
                        tool_use_id,
                        is_error,
                        content,
                    } = block
                    {
                        let name = call_names
                            .get(tool_use_id.as_str())
                            .copied()
                            .unwrap_or(tool_use_id.as_str());
                        let payload = if is_error.unwrap_or(false) {
                            json!({ "error": content })
                        } else {
                            json!({ "result": content })
                        };
                        pending_responses.push(json!({
                            "functionResponse": { "name": name, "response": payload }
                        }));
                    }
                }
            }
        }
    }

    if !pending_responses.is_empty() {
        contents.push(json!({ "role": "user", "parts": pending_responses }));
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    (system, contents)
}

fn convert_response(response: GeminiResponse, model: &str) -> Result<LlmResponse> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::MalformedResponse {
            message: "No candidates in response".to_string(),
        })?;

    let mut blocks = Vec::new();
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(text) = part.text {
            blocks.push(ContentBlock::Text { text });
        }
        if let Some(call) = part.function_call {
            blocks.push(ContentBlock::ToolUse {
                id: call.id.unwrap_or_else(|| format!("call_{}", Uuid::new_v4())),
                name: call.name,
                input: call.args.unwrap_or_else(|| json!({})),
            });
        }
    }

    let has_calls = blocks
        .iter()
        .any(|b| matches!(b, ContentBlock::ToolUse { .. }));
    let finish_reason = candidate.finish_reason.map(|reason| match reason.as_str() {
        "STOP" if has_calls => FinishReason::ToolCalls,
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" => {
            FinishReason::ContentFilter
        }
        _ => FinishReason::Other(reason),
    });

    let usage = response.usage_metadata.map(|u| {
        Usage::new(
            u.prompt_token_count.unwrap_or(0),
            u.candidates_token_count.unwrap_or(0),
        )
    });

    Ok(LlmResponse {
        message: LlmMessage::assistant_blocks(blocks),
        usage,
        model: response.model_version.unwrap_or_else(|| model.to_string()),
        finish_reason,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct GeminiFunctionCall {
    id: Option<String>,
    name: String,
    args: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}
