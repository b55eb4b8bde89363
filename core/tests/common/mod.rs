//! Shared mocks for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use rlm_core::error::Result;
use rlm_core::llm::{ChatOptions, LlmClient, LlmMessage, LlmResponse, ToolDefinition};
use rlm_core::repl::{Evaluation, Evaluator, EvaluatorFactory, NamespaceSeed, QueryHandler};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A model that replies with canned messages in order.
///
/// Once the script runs out it answers with a plain text message, which
/// ends any loop.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<LlmMessage>>,
    requests: Mutex<Vec<Vec<LlmMessage>>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<LlmMessage>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::default(),
        })
    }

    /// Replies that are all plain assistant text
    pub fn texts(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| LlmMessage::assistant(*r)).collect())
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Vec<LlmMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        _tools: Option<Vec<ToolDefinition>>,
        _options: Option<ChatOptions>,
    ) -> Result<LlmResponse> {
        self.requests.lock().unwrap().push(messages);
        let message = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| LlmMessage::assistant("[script exhausted]"));
        Ok(LlmResponse {
            message,
            usage: None,
            model: "scripted".to_string(),
            finish_reason: None,
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn provider_name(&self) -> &str {
        "test"
    }
}

/// Wrap `code` in a `repl` fence the way a model would
pub fn repl(code: &str) -> String {
    format!("Running this:\n```repl\n{}\n```", code)
}

/// True when a Python interpreter is available for end-to-end tests
pub fn python_available() -> bool {
    which::which("python3").is_ok()
}

/// Wraps another factory and counts fragments evaluated across every
/// namespace it builds.
pub struct CountingFactory<F> {
    inner: F,
    evaluations: Arc<AtomicUsize>,
}

impl<F: EvaluatorFactory> CountingFactory<F> {
    pub fn new(inner: F) -> Arc<Self> {
        Arc::new(Self {
            inner,
            evaluations: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

impl<F: EvaluatorFactory> EvaluatorFactory for CountingFactory<F> {
    fn create(&self, seed: NamespaceSeed) -> Box<dyn Evaluator> {
        Box::new(CountingEvaluator {
            inner: self.inner.create(seed),
            evaluations: self.evaluations.clone(),
        })
    }
}

struct CountingEvaluator {
    inner: Box<dyn Evaluator>,
    evaluations: Arc<AtomicUsize>,
}

#[async_trait]
impl Evaluator for CountingEvaluator {
    async fn evaluate(
        &mut self,
        fragment: &str,
        queries: &dyn QueryHandler,
    ) -> Result<Evaluation> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        self.inner.evaluate(fragment, queries).await
    }
}
