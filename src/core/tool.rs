use serde::{Deserialize, Serialize};

/// Function-calling style descriptor rendered from a tool schema, as printed
/// by `/tools json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Error,
    Skipped,
}

impl ToolStatus {
    /// Classifies dispatched tool output: anything starting with the literal
    /// `Error:` marker is an error, everything else succeeded.
    pub fn classify(result_text: &str) -> Self {
        if result_text.starts_with("Error:") {
            Self::Error
        } else {
            Self::Success
        }
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Outcome of one tool dispatch. Built once, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    pub args: serde_json::Map<String, serde_json::Value>,
    pub result: String,
    pub status: ToolStatus,
    pub warnings: Vec<String>,
}

impl ToolResult {
    pub fn new(
        tool: impl Into<String>,
        args: serde_json::Map<String, serde_json::Value>,
        result: String,
        warnings: Vec<String>,
    ) -> Self {
        let status = ToolStatus::classify(&result);
        Self {
            tool: tool.into(),
            args,
            result,
            status,
            warnings,
        }
    }

    pub fn skipped(
        tool: impl Into<String>,
        reason: impl Into<String>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            args: serde_json::Map::new(),
            result: reason.into(),
            status: ToolStatus::Skipped,
            warnings,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ToolStatus::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_uses_error_marker_prefix() {
        assert_eq!(ToolStatus::classify("Error: boom"), ToolStatus::Error);
        assert_eq!(ToolStatus::classify("stdout: Error: boom"), ToolStatus::Success);
        assert_eq!(ToolStatus::classify("error: lowercase"), ToolStatus::Success);
    }

    #[test]
    fn skipped_result_keeps_reason() {
        let result = ToolResult::skipped("unknown", "Skipped: invalid tool call format", vec![]);
        assert_eq!(result.status, ToolStatus::Skipped);
        assert!(!result.is_error());
        assert_eq!(result.status.to_string(), "skipped");
    }
}
