//! `run_any_file`: run a script or executable inside the working directory

use crate::error::Result;
use crate::impl_tool_factory;
use crate::tools::utils::{resolve_in_workspace, run_program, CommandOptions};
use crate::tools::{Tool, ToolCall, ToolContext, ToolExample, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};

const RUN_TIMEOUT_SECS: u64 = 30;

pub struct RunAnyFileTool {
    working_dir: PathBuf,
    python_command: String,
}

impl RunAnyFileTool {
    pub fn new(working_dir: impl Into<PathBuf>, python_command: impl Into<String>) -> Self {
        Self {
            working_dir: working_dir.into(),
            python_command: python_command.into(),
        }
    }

    fn from_context(context: &ToolContext) -> Self {
        Self::new(context.working_dir.clone(), context.python_command.clone())
    }

    /// Pick the program and leading arguments for a file by its extension
    fn invocation(&self, path: &Path) -> (String, Vec<String>) {
        let file = path.to_string_lossy().into_owned();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("py") => (self.python_command.clone(), vec![file]),
            Some("sh") => ("bash".to_string(), vec![file]),
            _ => (file, Vec::new()),
        }
    }
}

#[async_trait]
impl Tool for RunAnyFileTool {
    fn name(&self) -> &str {
        "run_any_file"
    }

    fn description(&self) -> &str {
        "Executes a file with optional arguments, constrained to the working directory. Python files run with the configured interpreter, shell scripts with bash, anything else directly. Runs are stopped after 30 seconds."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path of the file to execute, relative to the working directory."
                },
                "args": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional arguments passed to the file."
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let file_path: String = call.get_parameter("file_path")?;
        let extra: Vec<String> = call.get_parameter_or("args", Vec::new());
        let path = resolve_in_workspace(&self.working_dir, &file_path)?;

        if !path.is_file() {
            return Ok(ToolResult::error(
                call.id,
                format!("File \"{}\" not found", file_path),
            ));
        }

        let (program, mut args) = self.invocation(&path);
        args.extend(extra);

        let options = CommandOptions {
            timeout_seconds: RUN_TIMEOUT_SECS,
            working_directory: Some(self.working_dir.clone()),
            ..Default::default()
        };
        let output = match run_program(&program, &args, options).await {
            Ok(output) => output,
            Err(e) => {
                return Ok(ToolResult::error(
                    call.id,
                    format!("executing \"{}\": {}", file_path, e),
                ))
            }
        };

        if output.timed_out {
            return Ok(ToolResult::error(
                call.id,
                format!(
                    "\"{}\" did not finish within {} seconds",
                    file_path, RUN_TIMEOUT_SECS
                ),
            ));
        }

        let mut sections = Vec::new();
        if !output.stdout.is_empty() {
            sections.push(format!("STDOUT:\n{}", output.stdout));
        }
        if !output.stderr.is_empty() {
            sections.push(format!("STDERR:\n{}", output.stderr));
        }
        if output.exit_code != 0 {
            sections.push(format!("Process exited with code {}", output.exit_code));
        }

        let content = if sections.is_empty() {
            "No output produced.".to_string()
        } else {
            sections.join("\n")
        };

        Ok(ToolResult::success(call.id, content)
            .with_data(json!({ "exit_code": output.exit_code })))
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![ToolExample {
            description: "Run a Python script with one argument".to_string(),
            parameters: json!({"file_path": "main.py", "args": ["3 + 5"]}),
            expected_result: "STDOUT:\n8".to_string(),
        }]
    }
}

impl_tool_factory!(
    RunAnyFileToolFactory,
    RunAnyFileTool,
    "run_any_file",
    "Run a file with optional arguments"
);

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shell_script_output_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("greet.sh"),
            "echo \"hi $1\"\necho oops >&2\nexit 2\n",
        )
        .unwrap();
        let tool = RunAnyFileTool::new(dir.path(), "python3");

        let result = tool
            .execute(ToolCall::new(
                "run_any_file",
                json!({"file_path": "greet.sh", "args": ["there"]}),
            ))
            .await
            .unwrap();

        assert_eq!(
            result.content,
            "STDOUT:\nhi there\n\nSTDERR:\noops\n\nProcess exited with code 2"
        );
        assert_eq!(result.data, Some(json!({"exit_code": 2})));
    }

    #[tokio::test]
    async fn test_silent_script_reports_no_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("quiet.sh"), "true\n").unwrap();
        let tool = RunAnyFileTool::new(dir.path(), "python3");

        let result = tool
            .execute(ToolCall::new("run_any_file", json!({"file_path": "quiet.sh"})))
            .await
            .unwrap();
        assert_eq!(result.content, "No output produced.");
    }

    #[tokio::test]
    async fn test_python_files_use_the_configured_interpreter() {
        if which::which("python3").is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("add.py"), "import sys\nprint(sum(map(int, sys.argv[1:])))\n")
            .unwrap();
        let tool = RunAnyFileTool::new(dir.path(), "python3");

        let result = tool
            .execute(ToolCall::new(
                "run_any_file",
                json!({"file_path": "add.py", "args": ["3", "5"]}),
            ))
            .await
            .unwrap();
        assert_eq!(result.content, "STDOUT:\n8\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let tool = RunAnyFileTool::new(dir.path(), "python3");

        let result = tool
            .execute(ToolCall::new("run_any_file", json!({"file_path": "nope.py"})))
            .await
            .unwrap();
        assert!(!result.success);
    }
}
