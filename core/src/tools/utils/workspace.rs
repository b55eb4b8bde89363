//! Confining file tools to the working directory

use crate::error::{Result, ToolError};
use std::path::{Component, Path, PathBuf};

/// Resolve `relative` against `working_dir` and reject anything that ends up
/// outside it. Resolution is lexical, so targets that do not exist yet are
/// accepted.
pub fn resolve_in_workspace(working_dir: &Path, relative: &str) -> Result<PathBuf> {
    let base = if working_dir.is_absolute() {
        working_dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(working_dir)
    };
    let root = normalize(&base);
    let joined = normalize(&root.join(relative));

    if joined.starts_with(&root) {
        Ok(joined)
    } else {
        Err(ToolError::PathOutsideWorkspace {
            path: relative.to_string(),
        }
        .into())
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
