//! Code execution for sub-agents
//!
//! A sub-agent answers by writing fenced `repl` blocks. Each block runs in a
//! [`Namespace`] whose bindings persist for the whole delegation.

pub mod evaluator;
pub mod extract;
pub mod namespace;
pub mod python;
pub mod store;

pub use evaluator::{Evaluation, Evaluator, EvaluatorFactory, NamespaceSeed, QueryHandler};
pub use extract::extract_repl_code;
pub use namespace::{nested_task, Delegator, Namespace, TerminationRecord};
pub use python::{PythonEvaluator, PythonEvaluatorFactory};
pub use store::DataStore;

/// Text shown to a caller for a result value
pub fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
