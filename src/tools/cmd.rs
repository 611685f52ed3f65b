//! Shell command execution with a hard timeout.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::process::Command;

use crate::tools::types::{required_str, truncate_output, Tool, ToolContext, ToolError};

/// Per-stream cap on captured command output.
pub const MAX_STREAM_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: message.into(),
            exit_code: -1,
        }
    }

    pub fn timed_out(&self) -> bool {
        self.exit_code == -1 && self.stderr.starts_with("Command timed out")
    }

    /// `stdout: ...\nstderr: ...\ncode: N`, the text fed back to the model.
    pub fn render(&self) -> String {
        format!(
            "stdout: {}\nstderr: {}\ncode: {}",
            self.stdout, self.stderr, self.exit_code
        )
    }
}

fn shell_command(command: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

/// Runs `command` through the platform shell in `cwd`.
///
/// Never fails: spawn errors and timeouts come back as exit code `-1` with
/// the reason in `stderr`. A timed out child is killed.
pub async fn run_shell(command: &str, cwd: &Path, timeout: Duration) -> CommandOutput {
    let mut cmd = shell_command(command);
    cmd.current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            tracing::warn!(command, error = %err, "failed to spawn command");
            return CommandOutput::failed(err.to_string());
        }
    };

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => CommandOutput {
            stdout: truncate_output(&String::from_utf8_lossy(&output.stdout), MAX_STREAM_BYTES),
            stderr: truncate_output(&String::from_utf8_lossy(&output.stderr), MAX_STREAM_BYTES),
            exit_code: output.status.code().unwrap_or(-1),
        },
        Ok(Err(err)) => CommandOutput::failed(err.to_string()),
        Err(_) => {
            tracing::warn!(command, timeout_secs = timeout.as_secs_f64(), "command timed out");
            CommandOutput::failed(format!(
                "Command timed out after {}s",
                timeout.as_secs_f64()
            ))
        }
    }
}

pub struct RunCommandTool;

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    async fn invoke(
        &self,
        ctx: &mut ToolContext<'_>,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let command = required_str(args, "command")?;
        if command.trim().is_empty() {
            return Err(ToolError::InvalidInput("command must not be empty".into()));
        }

        tracing::info!(command = %command, "running command");
        let output = run_shell(&command, ctx.workspace_root(), ctx.command_timeout).await;
        Ok(output.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_streams_and_exit_code() {
        let temp = tempfile::tempdir().expect("tempdir");
        let output = run_shell("echo out; echo err >&2; exit 3", temp.path(), Duration::from_secs(10)).await;
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert_eq!(output.exit_code, 3);
        assert!(output.render().ends_with("code: 3"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_returns_structured_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let output = run_shell("sleep 5", temp.path(), Duration::from_millis(200)).await;
        assert_eq!(output.exit_code, -1);
        assert!(output.stderr.contains("timed out"));
        assert!(output.timed_out());
        assert!(output.stdout.is_empty());
    }

    #[tokio::test]
    async fn missing_cwd_is_reported_not_raised() {
        let output = run_shell("echo hi", Path::new("/definitely/not/here"), Duration::from_secs(5)).await;
        assert_eq!(output.exit_code, -1);
        assert!(!output.stderr.is_empty());
    }
}
