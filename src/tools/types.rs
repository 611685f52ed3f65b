//! Shared types and traits for the tool system.
//!
//! - [`Tool`]: capability interface every executable tool implements
//! - [`ToolContext`]: per-call access to the workspace policy and change tracker
//! - [`ToolError`]: failures that end up as `Error: ...` result text

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::policy::{PolicyDecision, PolicyEngine};
use crate::runtime::tracker::FileChangeTracker;
use crate::tools::schema::ToolSchema;

/// Errors that can occur during tool execution.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("path outside workspace: {0}")]
    PathOutsideWorkspace(String),
    #[error("{path} is too large ({size} bytes, limit {limit} bytes)")]
    TooLarge { path: String, size: u64, limit: u64 },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Execution(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What a tool gets to work with during one invocation.
pub struct ToolContext<'a> {
    pub policy: &'a PolicyEngine,
    pub tracker: &'a mut FileChangeTracker,
    pub command_timeout: Duration,
}

impl<'a> ToolContext<'a> {
    pub fn new(
        policy: &'a PolicyEngine,
        tracker: &'a mut FileChangeTracker,
        command_timeout: Duration,
    ) -> Self {
        Self {
            policy,
            tracker,
            command_timeout,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        self.policy.workspace_root()
    }

    /// Resolves a path argument through the workspace policy.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, ToolError> {
        match self.policy.evaluate_path(raw) {
            PolicyDecision::Allow(path) => Ok(path),
            PolicyDecision::Contained { resolved, .. } => Ok(resolved),
            PolicyDecision::Deny { requested } => Err(ToolError::PathOutsideWorkspace(
                requested.display().to_string(),
            )),
        }
    }

    /// Workspace-relative form of `path`, used as the tracker key and in
    /// result text.
    pub fn relative(&self, path: &Path) -> String {
        self.policy.display_relative(path)
    }
}

/// Capability interface for executable tools.
///
/// Tools are shared read-only across sessions, so they must be
/// `Send + Sync` and keep no per-call state.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// Schema for tools outside the static built-in catalog. Built-ins return
    /// `None` and are described by [`SchemaRegistry::builtin`].
    ///
    /// [`SchemaRegistry::builtin`]: crate::tools::schema::SchemaRegistry::builtin
    fn schema(&self) -> Option<ToolSchema> {
        None
    }

    async fn invoke(
        &self,
        ctx: &mut ToolContext<'_>,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError>;
}

/// Reads a string argument. Scalars other than strings are rendered as text
/// since models often send numbers or booleans for string fields.
pub fn str_arg<'a>(args: &'a Map<String, Value>, key: &str) -> Option<std::borrow::Cow<'a, str>> {
    match args.get(key)? {
        Value::String(s) => Some(std::borrow::Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(std::borrow::Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(std::borrow::Cow::Owned(b.to_string())),
        _ => None,
    }
}

pub fn required_str<'a>(
    args: &'a Map<String, Value>,
    key: &str,
) -> Result<std::borrow::Cow<'a, str>, ToolError> {
    str_arg(args, key).ok_or_else(|| ToolError::InvalidInput(format!("missing required parameter '{key}'")))
}

/// Truthy booleans: `true`, `"true"`, `"yes"`, `"1"`, non-zero numbers.
pub fn bool_arg(args: &Map<String, Value>, key: &str) -> bool {
    match args.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    }
}

/// Cuts `text` to at most `max_bytes` on a char boundary, marking the cut.
pub fn truncate_output(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}\n...[truncated]", &text[..cut])
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn str_arg_renders_scalars() {
        let a = args(json!({"s": "x", "n": 3, "b": true, "o": {}}));
        assert_eq!(str_arg(&a, "s").as_deref(), Some("x"));
        assert_eq!(str_arg(&a, "n").as_deref(), Some("3"));
        assert_eq!(str_arg(&a, "b").as_deref(), Some("true"));
        assert_eq!(str_arg(&a, "o"), None);
        assert!(required_str(&a, "missing").is_err());
    }

    #[test]
    fn bool_arg_accepts_common_spellings() {
        let a = args(json!({"t": "Yes", "f": "no", "n": 1, "b": false}));
        assert!(bool_arg(&a, "t"));
        assert!(!bool_arg(&a, "f"));
        assert!(bool_arg(&a, "n"));
        assert!(!bool_arg(&a, "b"));
        assert!(!bool_arg(&a, "absent"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_output("short", 10), "short");
        assert_eq!(truncate_output("héllo", 2), "h\n...[truncated]");
    }
}
