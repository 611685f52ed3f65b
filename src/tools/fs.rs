//! Filesystem tools: list, read, write, edit, mkdir, delete.
//!
//! Every path goes through the workspace policy first. Mutating tools read the
//! previous content before writing so the change tracker can tell a modify
//! from a create.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::tools::types::{bool_arg, required_str, str_arg, Tool, ToolContext, ToolError};

/// Files above this size are refused by `read_file`.
pub const MAX_READ_BYTES: u64 = 100 * 1024;
/// Entries shown by `list_directory` before the listing is cut.
pub const MAX_LIST_ENTRIES: usize = 500;

pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    async fn invoke(
        &self,
        ctx: &mut ToolContext<'_>,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let raw = str_arg(args, "path").unwrap_or(".".into());
        let dir = ctx.resolve(&raw)?;
        let shown = ctx.relative(&dir);

        if !dir.exists() {
            return Err(ToolError::NotFound(format!("directory '{shown}'")));
        }
        if !dir.is_dir() {
            return Err(ToolError::InvalidInput(format!("'{shown}' is not a directory")));
        }

        let mut entries: Vec<(String, bool, u64)> = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let (is_dir, size) = match entry.metadata() {
                Ok(meta) => (meta.is_dir(), meta.len()),
                Err(_) => (false, 0),
            };
            entries.push((name, is_dir, size));
        }
        // Directories first, then by name.
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        if entries.is_empty() {
            return Ok(format!("Directory '{shown}' is empty"));
        }

        let total = entries.len();
        let mut lines = vec![format!("Contents of '{shown}':")];
        for (name, is_dir, size) in entries.iter().take(MAX_LIST_ENTRIES) {
            if *is_dir {
                lines.push(format!("  {name}/"));
            } else {
                lines.push(format!("  {name} ({size} bytes)"));
            }
        }
        if total > MAX_LIST_ENTRIES {
            lines.push(format!("  ... and {} more", total - MAX_LIST_ENTRIES));
        }
        Ok(lines.join("\n"))
    }
}

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    async fn invoke(
        &self,
        ctx: &mut ToolContext<'_>,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let raw = required_str(args, "path")?;
        let path = ctx.resolve(&raw)?;
        let rel = ctx.relative(&path);

        let content = read_text(&path, &rel)?;
        ctx.tracker.record_read(&rel, &content, true);
        Ok(content)
    }
}

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    async fn invoke(
        &self,
        ctx: &mut ToolContext<'_>,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let raw = required_str(args, "path")?;
        let content = required_str(args, "content")?;
        let path = ctx.resolve(&raw)?;
        let rel = ctx.relative(&path);

        if path.is_dir() {
            return Err(ToolError::InvalidInput(format!("'{rel}' is a directory")));
        }

        let previous = std::fs::read_to_string(&path).ok();
        ctx.tracker
            .record_read(&rel, previous.as_deref().unwrap_or_default(), path.exists());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content.as_bytes())?;
        ctx.tracker.record_write(&rel, &content);

        tracing::debug!(path = %rel, bytes = content.len(), "file written");
        Ok(format!("Wrote {} bytes to {rel}", content.len()))
    }
}

pub struct EditFileTool;

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    async fn invoke(
        &self,
        ctx: &mut ToolContext<'_>,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let raw = required_str(args, "path")?;
        let old_text = required_str(args, "old_text")?;
        let new_text = required_str(args, "new_text")?;
        let all = bool_arg(args, "all_occurrences");

        if old_text.is_empty() {
            return Err(ToolError::InvalidInput("old_text must not be empty".into()));
        }

        let path = ctx.resolve(&raw)?;
        let rel = ctx.relative(&path);
        let original = read_text(&path, &rel)?;
        ctx.tracker.record_read(&rel, &original, true);

        let occurrences = original.matches(&*old_text).count();
        if occurrences == 0 {
            return Err(ToolError::InvalidInput(format!("old_text not found in {rel}")));
        }

        let (updated, replaced) = if all {
            (original.replace(&*old_text, &new_text), occurrences)
        } else {
            (original.replacen(&*old_text, &new_text, 1), 1)
        };
        std::fs::write(&path, updated.as_bytes())?;
        ctx.tracker.record_write(&rel, &updated);

        Ok(format!("Replaced {replaced} occurrence(s) in {rel}"))
    }
}

pub struct CreateDirectoryTool;

#[async_trait]
impl Tool for CreateDirectoryTool {
    fn name(&self) -> &str {
        "create_directory"
    }

    async fn invoke(
        &self,
        ctx: &mut ToolContext<'_>,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let raw = required_str(args, "path")?;
        let path = ctx.resolve(&raw)?;
        let rel = ctx.relative(&path);

        if path.is_file() {
            return Err(ToolError::InvalidInput(format!("'{rel}' already exists as a file")));
        }
        std::fs::create_dir_all(&path)?;
        Ok(format!("Created directory {rel}"))
    }
}

pub struct DeleteFileTool;

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }

    async fn invoke(
        &self,
        ctx: &mut ToolContext<'_>,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let raw = required_str(args, "path")?;
        let path = ctx.resolve(&raw)?;
        let rel = ctx.relative(&path);

        // A contained escape resolves to the root; never remove it.
        if path == ctx.workspace_root() {
            return Err(ToolError::InvalidInput(
                "refusing to delete the workspace root".into(),
            ));
        }
        if !path.exists() {
            return Err(ToolError::NotFound(format!("'{rel}'")));
        }

        if path.is_dir() {
            std::fs::remove_dir(&path).map_err(|e| {
                ToolError::Execution(format!("cannot remove directory {rel}: {e}"))
            })?;
            return Ok(format!("Deleted directory {rel}"));
        }

        let previous = std::fs::read_to_string(&path).unwrap_or_default();
        ctx.tracker.record_read(&rel, &previous, true);
        std::fs::remove_file(&path)?;
        ctx.tracker.record_delete(&rel);
        Ok(format!("Deleted {rel}"))
    }
}

fn read_text(path: &Path, rel: &str) -> Result<String, ToolError> {
    let meta = std::fs::metadata(path).map_err(|_| ToolError::NotFound(format!("file '{rel}'")))?;
    if meta.is_dir() {
        return Err(ToolError::InvalidInput(format!("'{rel}' is a directory")));
    }
    if meta.len() > MAX_READ_BYTES {
        return Err(ToolError::TooLarge {
            path: rel.to_string(),
            size: meta.len(),
            limit: MAX_READ_BYTES,
        });
    }
    std::fs::read_to_string(path)
        .map_err(|e| ToolError::Execution(format!("cannot read {rel} as text: {e}")))
}
