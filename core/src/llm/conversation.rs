//! Append-only conversation history

use super::message::LlmMessage;

/// Ordered turns of one agent run. Turns are only ever appended.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<LlmMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with a single requester turn
    pub fn seeded<S: Into<String>>(task: S) -> Self {
        let mut conversation = Self::new();
        conversation.push(LlmMessage::user(task));
        conversation
    }

    pub fn push(&mut self, message: LlmMessage) {
        self.turns.push(message);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[LlmMessage] {
        &self.turns
    }

    /// Build a request body: the system prompt followed by every turn
    pub fn with_system(&self, system_prompt: &str) -> Vec<LlmMessage> {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        messages.push(LlmMessage::system(system_prompt));
        messages.extend(self.turns.iter().cloned());
        messages
    }
}
