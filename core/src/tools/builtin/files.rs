//! File tools confined to the agent's working directory

use crate::error::{Result, ToolError};
use crate::impl_tool_factory;
use crate::tools::utils::{resolve_in_workspace, truncate_chars};
use crate::tools::{Tool, ToolCall, ToolContext, ToolExample, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use tokio::fs;

/// Characters returned by `get_file_content` before truncation
pub const MAX_FILE_CHARS: usize = 10000;

/// Lists the entries of a directory with sizes
pub struct GetFilesInfoTool {
    working_dir: PathBuf,
}

impl GetFilesInfoTool {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    fn from_context(context: &ToolContext) -> Self {
        Self::new(context.working_dir.clone())
    }
}

#[async_trait]
impl Tool for GetFilesInfoTool {
    fn name(&self) -> &str {
        "get_files_info"
    }

    fn description(&self) -> &str {
        "Lists files in the specified directory along with their sizes, constrained to the working directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "The directory to list files from, relative to the working directory. If not provided, lists files in the working directory itself."
                }
            }
        })
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let directory: String = call.get_parameter_or("directory", ".".to_string());
        let path = resolve_in_workspace(&self.working_dir, &directory)?;

        if !path.is_dir() {
            return Ok(ToolResult::error(
                call.id,
                format!("\"{}\" is not a directory", directory),
            ));
        }

        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            entries.push((
                entry.file_name().to_string_lossy().into_owned(),
                metadata.len(),
                metadata.is_dir(),
            ));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let listing = entries
            .iter()
            .map(|(name, size, is_dir)| {
                format!("- {}: file_size={} bytes, is_dir={}", name, size, is_dir)
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ToolResult::success(call.id, listing))
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![ToolExample {
            description: "List the working directory".to_string(),
            parameters: json!({}),
            expected_result: "- main.py: file_size=120 bytes, is_dir=false".to_string(),
        }]
    }
}

/// Reads a text file, truncating long content
pub struct GetFileContentTool {
    working_dir: PathBuf,
}

impl GetFileContentTool {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    fn from_context(context: &ToolContext) -> Self {
        Self::new(context.working_dir.clone())
    }
}

#[async_trait]
impl Tool for GetFileContentTool {
    fn name(&self) -> &str {
        "get_file_content"
    }

    fn description(&self) -> &str {
        "Reads and returns the content of a file, constrained to the working directory. Content longer than 10000 characters is truncated."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path of the file to read, relative to the working directory."
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let file_path: String = call.get_parameter("file_path")?;
        let path = resolve_in_workspace(&self.working_dir, &file_path)?;

        if !path.is_file() {
            return Ok(ToolResult::error(
                call.id,
                format!("File not found or is not a regular file: \"{}\"", file_path),
            ));
        }

        let bytes = fs::read(&path).await?;
        let text = String::from_utf8_lossy(&bytes);
        let notice = format!(
            "[...File \"{}\" truncated at {} characters]",
            file_path, MAX_FILE_CHARS
        );

        Ok(ToolResult::success(
            call.id,
            truncate_chars(&text, MAX_FILE_CHARS, &notice),
        ))
    }
}

/// Writes a file, creating parent directories
pub struct WriteFileTool {
    working_dir: PathBuf,
}

impl WriteFileTool {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    fn from_context(context: &ToolContext) -> Self {
        Self::new(context.working_dir.clone())
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Writes content to a file, creating it and any missing parent directories. Existing files are overwritten. Constrained to the working directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path of the file to write, relative to the working directory."
                },
                "content": {
                    "type": "string",
                    "description": "The content to write to the file."
                }
            },
            "required": ["file_path", "content"]
        })
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let file_path: String = call.get_parameter("file_path")?;
        let content: String = call.get_parameter("content")?;
        let path = resolve_in_workspace(&self.working_dir, &file_path)?;

        if path.is_dir() {
            return Ok(ToolResult::error(
                call.id,
                format!("\"{}\" is a directory", file_path),
            ));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &content).await?;

        Ok(ToolResult::success(
            call.id,
            format!(
                "Successfully wrote to \"{}\" ({} characters written)",
                file_path,
                content.chars().count()
            ),
        ))
    }
}

/// Deletes a single file
pub struct DeleteFileTool {
    working_dir: PathBuf,
}

impl DeleteFileTool {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    fn from_context(context: &ToolContext) -> Self {
        Self::new(context.working_dir.clone())
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn description(&self) -> &str {
        "Deletes a file, constrained to the working directory. Directories are not deleted."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path of the file to delete, relative to the working directory."
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let file_path: String = call.get_parameter("file_path")?;
        let path = resolve_in_workspace(&self.working_dir, &file_path)?;

        if path.is_dir() {
            return Err(ToolError::ExecutionFailed {
                name: "delete_file".to_string(),
                message: format!("\"{}\" is a directory", file_path),
            }
            .into());
        }
        if !path.exists() {
            return Ok(ToolResult::error(
                call.id,
                format!("File not found: \"{}\"", file_path),
            ));
        }

        fs::remove_file(&path).await?;
        Ok(ToolResult::success(
            call.id,
            format!("Successfully deleted \"{}\"", file_path),
        ))
    }
}

impl_tool_factory!(
    GetFilesInfoToolFactory,
    GetFilesInfoTool,
    "get_files_info",
    "List directory entries with sizes"
);

impl_tool_factory!(
    GetFileContentToolFactory,
    GetFileContentTool,
    "get_file_content",
    "Read a file's content"
);

impl_tool_factory!(
    WriteFileToolFactory,
    WriteFileTool,
    "write_file",
    "Write content to a file"
);

impl_tool_factory!(
    DeleteFileToolFactory,
    DeleteFileTool,
    "delete_file",
    "Delete a file"
);
