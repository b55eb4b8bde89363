//! LLM message structures

use serde::{Deserialize, Serialize};

/// One turn of a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmMessage {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: MessageContent,
}

/// Role of the message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (instructions)
    System,

    /// Requester turn (task text, REPL output)
    User,

    /// Responder turn (model output)
    Assistant,

    /// Tool message (tool execution result)
    Tool,
}

/// Content of a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content
    Text(String),

    /// Structured content with text and tool blocks
    Blocks(Vec<ContentBlock>),
}

/// A block of content within a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content
    Text { text: String },

    /// Tool use request
    ToolUse {
        /// Unique identifier for this tool use
        id: String,
        /// Name of the tool to use
        name: String,
        /// Input parameters for the tool
        input: serde_json::Value,
    },

    /// Tool result
    ToolResult {
        /// ID of the tool use this is a result for
        tool_use_id: String,
        /// Whether the tool execution failed
        is_error: Option<bool>,
        /// Result content
        content: String,
    },
}

impl LlmMessage {
    /// Create a new system message
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a new user message
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a new assistant message
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create an assistant message from blocks, collapsing a lone text block
    pub fn assistant_blocks(mut blocks: Vec<ContentBlock>) -> Self {
        let content = match blocks.as_slice() {
            [ContentBlock::Text { .. }] => match blocks.remove(0) {
                ContentBlock::Text { text } => MessageContent::Text(text),
                other => MessageContent::Blocks(vec![other]),
            },
            _ => MessageContent::Blocks(blocks),
        };
        Self {
            role: MessageRole::Assistant,
            content,
        }
    }

    /// Create a tool-result message answering one tool use
    pub fn tool_result<S: Into<String>>(tool_use_id: S, content: S, is_error: bool) -> Self {
        Self {
            role: MessageRole::Tool,
            content: MessageContent::Blocks(vec![ContentBlock::ToolResult {
                tool_use_id: tool_use_id.into(),
                is_error: Some(is_error),
                content: content.into(),
            }]),
        }
    }

    /// Get the text content of the message
    pub fn get_text(&self) -> Option<String> {
        match &self.content {
            MessageContent::Text(text) => Some(text.clone()),
            MessageContent::Blocks(blocks) => {
                let text_parts: Vec<&str> = blocks
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect();
                if text_parts.is_empty() {
                    None
                } else {
                    Some(text_parts.join("\n"))
                }
            }
        }
    }

    /// Check if the message contains tool use
    pub fn has_tool_use(&self) -> bool {
        !self.get_tool_uses().is_empty()
    }

    /// Extract tool use blocks from the message
    pub fn get_tool_uses(&self) -> Vec<&ContentBlock> {
        self.blocks()
            .iter()
            .filter(|block| matches!(block, ContentBlock::ToolUse { .. }))
            .collect()
    }

    /// Content blocks, empty for plain text messages
    pub fn blocks(&self) -> &[ContentBlock] {
        match &self.content {
            MessageContent::Text(_) => &[],
            MessageContent::Blocks(blocks) => blocks,
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lone_text_block_collapses() {
        let msg = LlmMessage::assistant_blocks(vec![ContentBlock::Text {
            text: "hello".to_string(),
        }]);
        assert_eq!(msg.content, MessageContent::Text("hello".to_string()));
        assert!(!msg.has_tool_use());
    }

    #[test]
    fn test_tool_uses_are_found() {
        let msg = LlmMessage::assistant_blocks(vec![
            ContentBlock::Text {
                text: "let me look".to_string(),
            },
            ContentBlock::ToolUse {
                id: "call_1".to_string(),
                name: "call_sub_rlm".to_string(),
                input: json!({"task": "count lines"}),
            },
        ]);
        assert!(msg.has_tool_use());
        assert_eq!(msg.get_tool_uses().len(), 1);
        assert_eq!(msg.get_text().as_deref(), Some("let me look"));
    }

    #[test]
    fn test_tool_result_has_no_text() {
        let msg = LlmMessage::tool_result("call_1", "42", false);
        assert_eq!(msg.role, MessageRole::Tool);
        assert!(msg.get_text().is_none());
    }
}
