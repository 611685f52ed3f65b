//! Script tools discovered from a directory at startup.
//!
//! Each regular file in the tools directory becomes a tool named after its
//! file stem. Arguments arrive as a JSON object on stdin with the workspace
//! path injected under `workspace`; stdout is the result.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::tools::cmd::MAX_STREAM_BYTES;
use crate::tools::schema::ToolSchema;
use crate::tools::types::{truncate_output, Tool, ToolContext, ToolError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTool {
    name: String,
    path: PathBuf,
}

impl ScriptTool {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> Result<String, ToolError> {
        std::fs::read_to_string(&self.path)
            .map_err(|e| ToolError::Execution(format!("cannot read tool '{}': {e}", self.name)))
    }

    fn command(&self) -> Command {
        let interpreter = match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("py") => Some("python3"),
            Some("sh") => Some("sh"),
            Some("js") => Some("node"),
            _ => None,
        };
        match interpreter {
            Some(program) => {
                let mut cmd = Command::new(program);
                cmd.arg(&self.path);
                cmd
            }
            None => Command::new(&self.path),
        }
    }
}

#[async_trait]
impl Tool for ScriptTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> Option<ToolSchema> {
        let file = self
            .path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        Some(ToolSchema::open(&self.name, &format!("Script tool ({file})")))
    }

    async fn invoke(
        &self,
        ctx: &mut ToolContext<'_>,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let workspace = ctx.workspace_root().to_path_buf();
        let mut payload = args.clone();
        payload.insert(
            "workspace".to_string(),
            Value::String(workspace.to_string_lossy().to_string()),
        );
        let input = serde_json::to_vec(&Value::Object(payload))
            .map_err(|e| ToolError::Execution(format!("failed encoding arguments: {e}")))?;

        let mut cmd = self.command();
        cmd.current_dir(&workspace)
            .env("LOCLM_WORKSPACE", &workspace)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| ToolError::Execution(format!("failed spawning tool '{}': {e}", self.name)))?;
        // Input is written concurrently; the timeout below must cover a
        // script that never reads it.
        if let Some(mut stdin) = child.stdin.take() {
            let name = self.name.clone();
            tokio::spawn(async move {
                match stdin.write_all(&input).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    Err(e) => tracing::warn!(tool = %name, error = %e, "failed writing tool input"),
                }
            });
        }

        let timeout = ctx.command_timeout;
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                ToolError::Execution(format!(
                    "tool '{}' timed out after {}s",
                    self.name,
                    timeout.as_secs_f64()
                ))
            })?
            .map_err(|e| ToolError::Execution(format!("tool '{}' failed: {e}", self.name)))?;

        if !output.status.success() {
            let stderr = truncate_output(String::from_utf8_lossy(&output.stderr).trim(), MAX_STREAM_BYTES);
            return Err(ToolError::Execution(format!(
                "tool '{}' exited with {}: {stderr}",
                self.name,
                output.status.code().unwrap_or(-1)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            Ok(format!("Tool '{}' completed with no output", self.name))
        } else {
            Ok(truncate_output(stdout, MAX_STREAM_BYTES))
        }
    }
}

/// Finds script tools in `dir`, sorted by name. Hidden files and names
/// starting with `_` are skipped. A missing directory yields no tools.
pub fn discover(dir: &Path) -> Vec<ScriptTool> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        tracing::debug!(dir = %dir.display(), "no script tools directory");
        return Vec::new();
    };

    let mut tools: Vec<ScriptTool> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_file()))
        .filter_map(|entry| {
            let path = entry.path();
            let stem = path.file_stem()?.to_str()?.to_string();
            if stem.is_empty() || stem.starts_with('.') || stem.starts_with('_') {
                return None;
            }
            Some(ScriptTool::new(stem.to_lowercase(), path))
        })
        .collect();

    tools.sort_by(|a, b| a.name.cmp(&b.name));
    tools.dedup_by(|a, b| a.name == b.name);
    tracing::debug!(count = tools.len(), dir = %dir.display(), "script tools discovered");
    tools
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_skips_private_and_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("deploy.sh"), "echo hi").unwrap();
        std::fs::write(dir.path().join("__init__.py"), "").unwrap();
        std::fs::write(dir.path().join(".hidden"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let tools = discover(dir.path());
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["deploy"]);
    }

    #[test]
    fn missing_directory_is_empty() {
        assert!(discover(Path::new("/no/such/tools/dir")).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn large_input_to_non_reading_script_still_times_out() {
        use std::time::Duration;

        use crate::policy::PolicyEngine;
        use crate::runtime::tracker::FileChangeTracker;

        let tools = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        let path = tools.path().join("slow.sh");
        std::fs::write(&path, "sleep 30\n").unwrap();
        let tool = ScriptTool::new("slow", path);

        let policy = PolicyEngine::new(workspace.path().to_path_buf());
        let mut tracker = FileChangeTracker::new();
        let mut ctx = ToolContext::new(&policy, &mut tracker, Duration::from_secs(1));
        let mut args = Map::new();
        args.insert("content".to_string(), Value::String("x".repeat(300 * 1024)));

        let outcome = tokio::time::timeout(Duration::from_secs(10), tool.invoke(&mut ctx, &args))
            .await
            .expect("script invocation must honour its own timeout");
        let err = outcome.unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
    }

    #[test]
    fn schema_is_open() {
        let tool = ScriptTool::new("deploy", PathBuf::from("/tools/deploy.sh"));
        let schema = tool.schema().unwrap();
        assert!(schema.open_parameters);
        assert_eq!(schema.description, "Script tool (deploy.sh)");
    }
}
