//! Tool registry for managing available tools

use crate::repl::Delegator;
use crate::tools::{Tool, ToolExecutor};
use std::path::PathBuf;
use std::sync::Arc;

/// What tools need from the agent that owns them
#[derive(Clone)]
pub struct ToolContext {
    /// Root that file tools are confined to
    pub working_dir: PathBuf,
    /// Interpreter used for `.py` files
    pub python_command: String,
    /// Runs `call_sub_rlm` delegations
    pub delegator: Arc<dyn Delegator>,
}

/// Factory trait for creating tools
pub trait ToolFactory: Send + Sync {
    /// Create a new instance of the tool
    fn create(&self, context: &ToolContext) -> Box<dyn Tool>;

    /// Get the name of the tool this factory creates
    fn tool_name(&self) -> &str;

    /// Get the description of the tool this factory creates
    fn tool_description(&self) -> &str;
}

/// Registry for managing tool creation and registration
pub struct ToolRegistry {
    factories: Vec<Box<dyn ToolFactory>>,
}

impl ToolRegistry {
    /// Create a new tool registry
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Register a tool factory, replacing one with the same name
    pub fn register_factory(&mut self, factory: Box<dyn ToolFactory>) {
        self.factories
            .retain(|existing| existing.tool_name() != factory.tool_name());
        self.factories.push(factory);
    }

    /// List all available tool names
    pub fn list_tools(&self) -> Vec<&str> {
        self.factories.iter().map(|f| f.tool_name()).collect()
    }

    /// Get tool information
    pub fn get_tool_info(&self, name: &str) -> Option<(&str, &str)> {
        self.factories
            .iter()
            .find(|f| f.tool_name() == name)
            .map(|f| (f.tool_name(), f.tool_description()))
    }

    /// Create a tool executor with the specified tools, in the given order
    pub fn create_executor(&self, tool_names: &[String], context: &ToolContext) -> ToolExecutor {
        let mut executor = ToolExecutor::new();

        for name in tool_names {
            match self.factories.iter().find(|f| f.tool_name() == name) {
                Some(factory) => executor.register_tool(factory.create(context)),
                None => tracing::warn!(tool = %name, "Unknown tool in configuration, skipping"),
            }
        }

        executor
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        use crate::tools::builtin::*;

        let mut registry = Self::new();
        registry.register_factory(Box::new(CallSubRlmToolFactory));
        registry.register_factory(Box::new(GetFilesInfoToolFactory));
        registry.register_factory(Box::new(GetFileContentToolFactory));
        registry.register_factory(Box::new(WriteFileToolFactory));
        registry.register_factory(Box::new(DeleteFileToolFactory));
        registry.register_factory(Box::new(RunAnyFileToolFactory));
        registry
    }
}

/// Implements [`ToolFactory`] for a tool built from a [`ToolContext`]
#[macro_export]
macro_rules! impl_tool_factory {
    ($factory:ident, $tool:ident, $name:expr, $description:expr) => {
        pub struct $factory;

        impl $crate::tools::ToolFactory for $factory {
            fn create(
                &self,
                context: &$crate::tools::ToolContext,
            ) -> Box<dyn $crate::tools::Tool> {
                Box::new($tool::from_context(context))
            }

            fn tool_name(&self) -> &str {
                $name
            }

            fn tool_description(&self) -> &str {
                $description
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;

    struct NoDelegation;

    #[async_trait]
    impl Delegator for NoDelegation {
        async fn delegate(&self, _task: String, _depth: usize) -> Value {
            Value::Null
        }
    }

    fn context() -> ToolContext {
        ToolContext {
            working_dir: PathBuf::from("."),
            python_command: "python3".to_string(),
            delegator: Arc::new(NoDelegation),
        }
    }

    const EXPECTED: [&str; 6] = [
        "call_sub_rlm",
        "get_files_info",
        "get_file_content",
        "write_file",
        "delete_file",
        "run_any_file",
    ];

    #[test]
    fn test_default_registry_has_the_closed_tool_set() {
        let registry = ToolRegistry::default();
        assert_eq!(registry.list_tools(), EXPECTED.to_vec());
    }

    #[test]
    fn test_every_tool_has_an_object_schema() {
        let registry = ToolRegistry::default();
        let names: Vec<String> = EXPECTED.iter().map(|s| s.to_string()).collect();
        let executor = registry.create_executor(&names, &context());

        for definition in executor.get_tool_definitions() {
            assert_eq!(definition.function.parameters["type"], "object");
            assert!(!definition.function.description.is_empty());
            let (name, description) = registry.get_tool_info(&definition.function.name).unwrap();
            assert_eq!(name, definition.function.name);
            assert!(!description.is_empty());
        }
    }

    #[test]
    fn test_call_sub_rlm_requires_task() {
        let registry = ToolRegistry::default();
        let executor = registry.create_executor(&["call_sub_rlm".to_string()], &context());
        let definitions = executor.get_tool_definitions();
        assert_eq!(definitions[0].function.parameters["required"], serde_json::json!(["task"]));
    }

    #[test]
    fn test_unknown_names_are_skipped() {
        let registry = ToolRegistry::default();
        let executor = registry.create_executor(
            &["get_files_info".to_string(), "bash".to_string()],
            &context(),
        );
        assert_eq!(executor.list_tools(), vec!["get_files_info"]);
    }
}
