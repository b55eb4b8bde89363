//! Built-in tools

pub mod delegate;
pub mod files;
pub mod run_file;

pub use delegate::{CallSubRlmTool, CallSubRlmToolFactory};
pub use files::{
    DeleteFileTool, DeleteFileToolFactory, GetFileContentTool, GetFileContentToolFactory,
    GetFilesInfoTool, GetFilesInfoToolFactory, WriteFileTool, WriteFileToolFactory,
};
pub use run_file::{RunAnyFileTool, RunAnyFileToolFactory};
