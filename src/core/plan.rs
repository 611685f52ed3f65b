use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub description: String,
    pub tool: Option<String>,
    pub reasoning: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

/// Pre-execution breakdown of what the agent intends to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPlan {
    pub goal: String,
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub requires_confirmation: bool,
}

impl AgentPlan {
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|step| step.completed)
    }

    /// Marks the first pending step that uses `tool` as completed.
    /// Returns the index of the step that was marked, if any.
    pub fn mark_tool_completed(&mut self, tool: &str) -> Option<usize> {
        let idx = self
            .steps
            .iter()
            .position(|step| !step.completed && step.tool.as_deref() == Some(tool))?;
        self.steps[idx].completed = true;
        Some(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(tool: Option<&str>) -> PlanStep {
        PlanStep {
            description: "step".into(),
            tool: tool.map(str::to_string),
            reasoning: None,
            completed: false,
        }
    }

    #[test]
    fn mark_tool_completed_advances_in_order() {
        let mut plan = AgentPlan {
            goal: "edit".into(),
            steps: vec![step(Some("read_file")), step(Some("write_file")), step(Some("read_file"))],
            requires_confirmation: false,
        };

        assert_eq!(plan.mark_tool_completed("read_file"), Some(0));
        assert_eq!(plan.mark_tool_completed("read_file"), Some(2));
        assert_eq!(plan.mark_tool_completed("read_file"), None);
        assert!(!plan.is_complete());
        assert_eq!(plan.mark_tool_completed("write_file"), Some(1));
        assert!(plan.is_complete());
    }

    #[test]
    fn empty_plan_is_complete() {
        let plan = AgentPlan {
            goal: String::new(),
            steps: vec![],
            requires_confirmation: false,
        };
        assert!(plan.is_complete());
    }
}
