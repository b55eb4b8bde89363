//! The swappable capability that runs code fragments

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

use super::store::DataStore;

/// What one fragment produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// Text printed during this fragment only
    pub output: String,
    /// Readable description of a fault raised by the fragment, if any
    pub fault: Option<String>,
    /// The value passed to `FINAL`, when this fragment finished the namespace
    pub finished: Option<Value>,
}

impl Evaluation {
    pub fn output<S: Into<String>>(output: S) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn with_fault<S: Into<String>>(mut self, fault: S) -> Self {
        self.fault = Some(fault.into());
        self
    }

    pub fn with_final(mut self, value: Value) -> Self {
        self.finished = Some(value);
        self
    }

    /// Output text as the model sees it: printed text followed by the fault
    pub fn render(&self) -> String {
        match &self.fault {
            None => self.output.clone(),
            Some(fault) => {
                let mut text = self.output.clone();
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push_str("Error: ");
                text.push_str(fault);
                text
            }
        }
    }
}

/// Everything a fresh namespace is seeded with
#[derive(Debug, Clone, Default)]
pub struct NamespaceSeed {
    /// Bound as `context`
    pub context: String,
    /// Exposed through `os.environ`
    pub data: DataStore,
}

/// Answers `llm_query` calls made by running code
#[async_trait]
pub trait QueryHandler: Send + Sync {
    /// Run a nested query and return its result value
    async fn query(&self, query: String, context: String) -> Value;
}

/// Runs fragments against one persistent set of bindings
#[async_trait]
pub trait Evaluator: Send {
    /// Execute `fragment`, serving any nested queries through `queries`.
    ///
    /// Faults raised by the fragment are reported in the returned
    /// [`Evaluation`]; `Err` is reserved for infrastructure failures.
    async fn evaluate(&mut self, fragment: &str, queries: &dyn QueryHandler)
        -> Result<Evaluation>;
}

/// Builds one evaluator per namespace
pub trait EvaluatorFactory: Send + Sync {
    fn create(&self, seed: NamespaceSeed) -> Box<dyn Evaluator>;
}
