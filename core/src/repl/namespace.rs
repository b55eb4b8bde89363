//! Execution namespace owned by one delegation

use crate::error::{ReplError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::evaluator::{Evaluator, EvaluatorFactory, NamespaceSeed, QueryHandler};
use super::store::DataStore;

/// Runs a task in a fresh delegation one level deeper
#[async_trait]
pub trait Delegator: Send + Sync {
    async fn delegate(&self, task: String, depth: usize) -> Value;
}

/// `(finished, result)`, set at most once
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerminationRecord {
    result: Option<Value>,
}

impl TerminationRecord {
    /// Record `value` unless a result is already present. Returns whether it was recorded.
    pub fn finish(&mut self, value: Value) -> bool {
        if self.result.is_some() {
            return false;
        }
        self.result = Some(value);
        true
    }

    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }
}

/// Build the task text for a nested `llm_query`
pub fn nested_task(query: &str, context: &str) -> String {
    if context.is_empty() {
        query.to_string()
    } else {
        format!("{}\n\nContext:\n{}", query, context)
    }
}

/// Serves `llm_query` by delegating at `depth + 1`
struct NestedQuery<'a> {
    delegator: &'a dyn Delegator,
    depth: usize,
    max_depth: usize,
}

#[async_trait]
impl QueryHandler for NestedQuery<'_> {
    async fn query(&self, query: String, context: String) -> Value {
        let task = nested_task(&query, &context);
        debug!(
            depth = self.depth + 1,
            max_depth = self.max_depth,
            "Nested llm_query"
        );
        self.delegator.delegate(task, self.depth + 1).await
    }
}

/// Persistent bindings plus the injected primitives for one delegation
pub struct Namespace {
    evaluator: Box<dyn Evaluator>,
    delegator: Arc<dyn Delegator>,
    termination: TerminationRecord,
    depth: usize,
    max_depth: usize,
}

impl Namespace {
    pub fn new(
        task: &str,
        delegator: Arc<dyn Delegator>,
        depth: usize,
        max_depth: usize,
        factory: &dyn EvaluatorFactory,
        data: &DataStore,
    ) -> Self {
        let evaluator = factory.create(NamespaceSeed {
            context: task.to_string(),
            data: data.clone(),
        });
        Self {
            evaluator,
            delegator,
            termination: TerminationRecord::default(),
            depth,
            max_depth,
        }
    }

    /// Run one fragment and return the text it printed, with any fault appended.
    ///
    /// A finished namespace rejects further fragments.
    pub async fn execute(&mut self, fragment: &str) -> Result<String> {
        if self.termination.is_finished() {
            return Err(ReplError::AlreadyFinished.into());
        }

        let queries = NestedQuery {
            delegator: self.delegator.as_ref(),
            depth: self.depth,
            max_depth: self.max_depth,
        };
        let evaluation = self.evaluator.evaluate(fragment, &queries).await?;

        if let Some(value) = evaluation.finished.clone() {
            self.termination.finish(value);
        }
        Ok(evaluation.render())
    }

    pub fn is_finished(&self) -> bool {
        self.termination.is_finished()
    }

    pub fn result(&self) -> Option<&Value> {
        self.termination.result()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Evaluator that answers fixed fragments
    struct Scripted;

    #[async_trait]
    impl Evaluator for Scripted {
        async fn evaluate(
            &mut self,
            fragment: &str,
            queries: &dyn QueryHandler,
        ) -> Result<crate::repl::Evaluation> {
            use crate::repl::Evaluation;
            Ok(match fragment {
                "finish" => Evaluation::output("done\n").with_final(json!(5)),
                "finish again" => Evaluation::default().with_final(json!(6)),
                "boom" => Evaluation::output("half\n").with_fault("ValueError: bad (line 1)"),
                "ask" => {
                    let answer = queries.query("sub".into(), "ctx".into()).await;
                    Evaluation::output(format!("{}\n", answer))
                }
                _ => Evaluation::default(),
            })
        }
    }

    struct ScriptedFactory;

    impl EvaluatorFactory for ScriptedFactory {
        fn create(&self, _seed: NamespaceSeed) -> Box<dyn Evaluator> {
            Box::new(Scripted)
        }
    }

    #[derive(Default)]
    struct RecordingDelegator {
        calls: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl Delegator for RecordingDelegator {
        async fn delegate(&self, task: String, depth: usize) -> Value {
            self.calls.lock().unwrap().push((task, depth));
            json!("nested")
        }
    }

    fn namespace(delegator: Arc<RecordingDelegator>, depth: usize) -> Namespace {
        Namespace::new("task", delegator, depth, 1, &ScriptedFactory, &DataStore::new())
    }

    #[test]
    fn test_termination_record_is_set_once() {
        let mut record = TerminationRecord::default();
        assert!(!record.is_finished());
        assert!(record.finish(json!(1)));
        assert!(!record.finish(json!(2)));
        assert_eq!(record.result(), Some(&json!(1)));
    }

    #[test]
    fn test_nested_task_format() {
        assert_eq!(nested_task("q", ""), "q");
        assert_eq!(nested_task("q", "data"), "q\n\nContext:\ndata");
    }

    #[tokio::test]
    async fn test_execute_after_finish_is_rejected() {
        let mut ns = namespace(Arc::new(RecordingDelegator::default()), 0);

        let output = ns.execute("finish").await.unwrap();
        assert_eq!(output, "done\n");
        assert!(ns.is_finished());

        let err = ns.execute("finish again").await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Repl(ReplError::AlreadyFinished)
        ));
        assert_eq!(ns.result(), Some(&json!(5)));
    }

    #[tokio::test]
    async fn test_fault_is_rendered_not_raised() {
        let mut ns = namespace(Arc::new(RecordingDelegator::default()), 0);

        let output = ns.execute("boom").await.unwrap();
        assert_eq!(output, "half\nError: ValueError: bad (line 1)");
        assert!(!ns.is_finished());
    }

    #[tokio::test]
    async fn test_llm_query_delegates_one_level_deeper() {
        let delegator = Arc::new(RecordingDelegator::default());
        let mut ns = namespace(delegator.clone(), 1);

        let output = ns.execute("ask").await.unwrap();
        assert_eq!(output, "\"nested\"\n");

        let calls = delegator.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[("sub\n\nContext:\nctx".to_string(), 2)]);
    }
}
