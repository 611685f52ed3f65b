//! Optional pre-execution planning.
//!
//! The model is asked for a fenced `plan` object; parsing is lenient and any
//! failure just means "no plan".

use serde_json::Value;

use crate::core::plan::{AgentPlan, PlanStep};
use crate::model::extract::fenced_blocks;

const PLANNING_PROMPT: &str = r#"Based on the user's request, create a plan of steps to accomplish the task.

Format your response as a JSON object:
```plan
{
    "goal": "Brief description of what we're trying to achieve",
    "steps": [
        {
            "description": "What this step does",
            "tool": "tool_name or null if no tool needed",
            "reasoning": "Why this step is needed"
        }
    ],
    "requires_confirmation": true/false (set true for destructive operations like delete, overwrite)
}
```

Guidelines:
- Break complex tasks into simple, atomic steps
- Each step should use at most one tool
- Order steps logically (e.g., read before edit)
- For file modifications, always read first
- Set requires_confirmation=true for: file deletion, overwriting existing files, running potentially dangerous commands
"#;

const PLANNING_KEYWORDS: &[&str] = &[
    "create",
    "build",
    "implement",
    "add",
    "write",
    "fix",
    "refactor",
    "update",
    "modify",
    "change",
    "delete",
    "remove",
    "move",
    "rename",
    "install",
    "setup",
    "configure",
    "analyze",
    "review",
    "find all",
    "search and replace",
];

const CONNECTIVES: &[&str] = &["and", "then", "also", "after that"];

pub fn build_planning_prompt(user_request: &str, workspace_context: &str) -> String {
    let context = if workspace_context.trim().is_empty() {
        "No workspace context available"
    } else {
        workspace_context
    };
    format!("{PLANNING_PROMPT}\nUser request: {user_request}\n\nCurrent workspace context:\n{context}\n")
}

/// Tries a `plan` fence, then a `json` fence, then the first balanced `{...}`
/// mentioning `goal`. Each stage falls through to the next on failure.
pub fn parse_plan(response: &str) -> Option<AgentPlan> {
    let blocks = fenced_blocks(response);
    for info in ["plan", "json"] {
        let parsed = blocks
            .iter()
            .filter(|b| b.info.eq_ignore_ascii_case(info))
            .find_map(|b| parse_plan_json(b.body.trim()));
        if parsed.is_some() {
            return parsed;
        }
    }

    let mut search_from = 0;
    while let Some(offset) = response[search_from..].find('{') {
        let start = search_from + offset;
        let Some(end) = matching_brace(response, start) else {
            break;
        };
        let candidate = &response[start..=end];
        if candidate.contains("goal") {
            if let Some(plan) = parse_plan_json(candidate) {
                return Some(plan);
            }
        }
        search_from = end + 1;
    }

    tracing::debug!("no plan found in planning response");
    None
}

/// Index of the `}` closing the `{` at `start`, by depth counting.
fn matching_brace(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_plan_json(raw: &str) -> Option<AgentPlan> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(error = %err, "plan candidate is not valid JSON");
            return None;
        }
    };
    let object = value.as_object()?;

    let text_field = |v: &Value, key: &str| -> Option<String> {
        v.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null") && !s.eq_ignore_ascii_case("none"))
            .map(str::to_string)
    };

    let steps = object
        .get("steps")
        .and_then(Value::as_array)
        .map(|steps| {
            steps
                .iter()
                .map(|step| PlanStep {
                    description: text_field(step, "description").unwrap_or_default(),
                    tool: text_field(step, "tool"),
                    reasoning: text_field(step, "reasoning"),
                    completed: false,
                })
                .collect()
        })
        .unwrap_or_default();

    Some(AgentPlan {
        goal: text_field(&value, "goal").unwrap_or_default(),
        steps,
        requires_confirmation: object
            .get("requires_confirmation")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

/// Advisory check for requests that look multi-step.
///
/// Keywords match at the start of a word (`fixing` counts for `fix`),
/// connectives must be whole words. Multi-word phrases match anywhere.
pub fn needs_planning(request: &str) -> bool {
    let lower = request.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .collect();

    let phrase_or = |phrase: &str, word_match: &dyn Fn(&str) -> bool| {
        if phrase.contains(' ') {
            lower.contains(phrase)
        } else {
            words.iter().any(|w| word_match(w))
        }
    };

    PLANNING_KEYWORDS
        .iter()
        .any(|kw| phrase_or(kw, &|w: &str| w.starts_with(kw)))
        || CONNECTIVES
            .iter()
            .any(|c| phrase_or(c, &|w: &str| w == *c))
}

/// Markdown-ish rendering for terminals and chat transcripts.
pub fn format_plan(plan: &AgentPlan) -> String {
    let mut lines = vec![format!("**Plan: {}**", plan.goal), String::new()];

    for (i, step) in plan.steps.iter().enumerate() {
        let status = if step.completed { "✓" } else { "○" };
        let tool_info = step
            .tool
            .as_deref()
            .map(|tool| format!(" (using `{tool}`)"))
            .unwrap_or_default();
        lines.push(format!("{status} {}. {}{tool_info}", i + 1, step.description));
    }

    if plan.requires_confirmation {
        lines.push(String::new());
        lines.push(
            "⚠️ This plan includes potentially destructive operations. Please confirm to proceed."
                .to_string(),
        );
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const PLAN_JSON: &str = r#"{
        "goal": "Add a greeting",
        "steps": [
            {"description": "Read main", "tool": "read_file", "reasoning": "see current code"},
            {"description": "Explain", "tool": null}
        ],
        "requires_confirmation": true
    }"#;

    #[test]
    fn prompt_embeds_request_and_context() {
        let prompt = build_planning_prompt("fix the bug", "");
        assert!(prompt.contains("```plan"));
        assert!(prompt.contains("User request: fix the bug"));
        assert!(prompt.contains("No workspace context available"));

        let prompt = build_planning_prompt("x", "src/\nCargo.toml");
        assert!(prompt.contains("Current workspace context:\nsrc/\nCargo.toml"));
    }

    #[test]
    fn parses_plan_fence() {
        let response = format!("Sure.\n```plan\n{PLAN_JSON}\n```");
        let plan = parse_plan(&response).expect("plan");
        assert_eq!(plan.goal, "Add a greeting");
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].tool.as_deref(), Some("read_file"));
        assert_eq!(plan.steps[0].reasoning.as_deref(), Some("see current code"));
        assert_eq!(plan.steps[1].tool, None);
        assert!(plan.requires_confirmation);
    }

    #[test]
    fn broken_plan_fence_falls_through_to_json_fence() {
        let response = format!("```plan\n{{ nope\n```\n```json\n{PLAN_JSON}\n```");
        assert_eq!(parse_plan(&response).expect("plan").goal, "Add a greeting");
    }

    #[test]
    fn parses_bare_object_by_brace_depth() {
        let response = format!("I think {{this}} works: {PLAN_JSON} -- done");
        let plan = parse_plan(&response).expect("plan");
        assert_eq!(plan.steps[1].description, "Explain");
    }

    #[test]
    fn garbage_yields_no_plan() {
        assert_eq!(parse_plan("no structure here"), None);
        assert_eq!(parse_plan("{ \"goal\": unterminated"), None);
    }

    #[test]
    fn needs_planning_heuristic() {
        assert!(needs_planning("Create a README"));
        assert!(needs_planning("fixing the tests please"));
        assert!(needs_planning("read a.txt then b.txt"));
        assert!(needs_planning("Find all TODO markers"));
        assert!(!needs_planning("what is in main.rs?"));
        assert!(!needs_planning("explain the brand logo"));
    }

    #[test]
    fn format_plan_marks_progress_and_confirmation() {
        let mut plan = parse_plan(&format!("```plan\n{PLAN_JSON}\n```")).expect("plan");
        plan.steps[0].completed = true;
        assert_eq!(
            format_plan(&plan),
            "**Plan: Add a greeting**\n\n✓ 1. Read main (using `read_file`)\n○ 2. Explain\n\n⚠️ This plan includes potentially destructive operations. Please confirm to proceed."
        );
    }
}
