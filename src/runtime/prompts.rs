//! System prompts for the two loop modes.

use std::path::Path;

pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful AI coding assistant. Respond directly and conversationally to user questions. Do not attempt to use any tools or execute any commands.";

const AGENT_PREAMBLE: &str = r#"You are a helpful AI coding assistant with access to local tools that operate on the user's workspace.

When you need to use a tool, respond with exactly one JSON block and nothing after it:
```tool
{
    "tool": "tool_name",
    "args": {"arg1": "value1"}
}
```

After the tool runs you will receive its output as "Tool result: ...". Use it to decide the next step.
When the task is done, answer in plain text without a tool block.

Rules:
- Paths are relative to the workspace root. Use "." for the root itself.
- Read a file before editing it.
- Results starting with "Error:" mean the call failed; fix the arguments and try again."#;

fn platform_section() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "Platform: Windows. run_command uses cmd.exe; prefer list_directory and read_file over shell commands."
    }

    #[cfg(target_os = "macos")]
    {
        "Platform: macOS. run_command uses sh; standard Unix commands are available."
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        "Platform: Linux. run_command uses sh; standard Unix commands are available."
    }
}

/// Agent-mode prompt documenting the tool surface and the active workspace.
pub fn agent_system_prompt(tool_help: &str, workspace: &Path) -> String {
    format!(
        "{AGENT_PREAMBLE}\n\n{}\n\nWorkspace: {}\n\n{tool_help}",
        platform_section(),
        workspace.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_prompt_lists_tools_and_workspace() {
        let prompt = agent_system_prompt("Available tools:\n  read_file(path)", Path::new("/work"));
        assert!(prompt.contains("```tool"));
        assert!(prompt.contains("Workspace: /work"));
        assert!(prompt.ends_with("read_file(path)"));
    }
}
