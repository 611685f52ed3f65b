//! Conversational agent loop.
//!
//! One [`AgentLoop`] is one session: it owns the conversation history, the
//! file change tracker and the current plan. Turns are processed strictly one
//! at a time (`process` takes `&mut self`). The tool registry and its schema
//! catalog are read-only after construction and can be shared between
//! sessions through an `Arc`.
//!
//! Agent mode per user prompt:
//! 1. Call the model with the system prompt plus full history.
//! 2. No tool call in the reply: record it, strip stray tool fences, return.
//! 3. Tool call: normalize, dispatch, record the raw reply and a
//!    `Tool result: ...` user turn, go back to 1.
//! 4. Stop after `max_iterations` tool calls with a "completed N operations"
//!    notice.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::{AgentConfig, ProviderConfig};
use crate::core::conversation::ConversationTurn;
use crate::core::plan::AgentPlan;
use crate::core::tool::ToolResult;
use crate::model::{
    build_client, extract_tool_call, strip_tool_call_fences, ChatModel, ModelError,
    ModelSelection, ProviderHealth, ProviderId,
};
use crate::policy::PolicyEngine;
use crate::runtime::planner::{build_planning_prompt, needs_planning, parse_plan};
use crate::runtime::prompts::{agent_system_prompt, CHAT_SYSTEM_PROMPT};
use crate::runtime::tracker::{ChangeSummary, FileChange, FileChangeTracker};
use crate::tools::{ToolContext, ToolRegistry};
use crate::AppError;

/// Entries listed in the workspace context handed to the planner.
const PLAN_CONTEXT_ENTRIES: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// One model call per turn, no tools.
    #[default]
    Chat,
    Agent,
}

impl AgentMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AgentMode::Chat => "chat",
            AgentMode::Agent => "agent",
        }
    }
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(AgentMode::Chat),
            "agent" => Ok(AgentMode::Agent),
            _ => Err(format!("unknown mode: {s} (expected chat or agent)")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    #[default]
    Idle,
    AwaitingLlm,
    ToolCallPending,
    ToolExecuting,
    FinalResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub max_iterations: usize,
    /// When false, tool calls are dispatched exactly as the model wrote them.
    pub use_middleware: bool,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_iterations: crate::config::DEFAULT_MAX_ITERATIONS,
            use_middleware: true,
        }
    }
}

impl LoopSettings {
    /// The simple loop: five iterations, raw tool calls.
    pub const fn legacy() -> Self {
        Self {
            max_iterations: 5,
            use_middleware: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    pub response: String,
    pub tool_calls: Vec<ToolResult>,
    /// Model calls made for this turn, planning excluded.
    pub iterations: usize,
    pub mode: AgentMode,
    pub plan: Option<AgentPlan>,
}

pub struct AgentLoop {
    session_id: String,
    config: AgentConfig,
    model: Box<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    policy: PolicyEngine,
    tracker: FileChangeTracker,
    history: Vec<ConversationTurn>,
    mode: AgentMode,
    state: AgentState,
    settings: LoopSettings,
    current_plan: Option<AgentPlan>,
}

impl fmt::Debug for AgentLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentLoop")
            .field("session_id", &self.session_id)
            .field("provider", &self.model.provider_name())
            .field("model", &self.model.model_id())
            .field("workspace", &self.policy.workspace_root())
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("history", &self.history.len())
            .finish()
    }
}

impl AgentLoop {
    /// Builds the provider client from `config` and scans the tools directory.
    pub fn new(config: AgentConfig) -> Result<Self, AppError> {
        let model = build_client(&config.provider, config.llm_timeout)?;
        Ok(Self::with_model(config, model))
    }

    /// Uses an already constructed model client.
    pub fn with_model(config: AgentConfig, model: Box<dyn ChatModel>) -> Self {
        let tools = Arc::new(ToolRegistry::with_tools_dir(config.tools_dir.as_deref()));
        let policy = PolicyEngine::with_containment(config.workspace.clone(), config.containment);
        let settings = LoopSettings {
            max_iterations: config.max_iterations,
            use_middleware: true,
        };
        let session_id = Uuid::new_v4().to_string();
        tracing::info!(
            session = %session_id,
            workspace = %policy.workspace_root().display(),
            provider = model.provider_name(),
            model = %model.model_id(),
            "agent loop ready"
        );
        Self {
            session_id,
            config,
            model,
            tools,
            policy,
            tracker: FileChangeTracker::new(),
            history: Vec::new(),
            mode: AgentMode::default(),
            state: AgentState::Idle,
            settings,
            current_plan: None,
        }
    }

    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Shares a registry built elsewhere, e.g. by another session.
    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_mode(mut self, mode: AgentMode) -> Self {
        self.mode = mode;
        self
    }

    // -----------------------------------------------------------------------
    // Turn processing
    // -----------------------------------------------------------------------

    /// Runs one user turn to completion. Never fails: provider and tool
    /// errors come back as response text.
    pub async fn process(&mut self, prompt: &str) -> AgentResponse {
        tracing::info!(
            session = %self.session_id,
            mode = %self.mode,
            chars = prompt.len(),
            "processing prompt"
        );

        let plan = if self.config.auto_plan
            && self.mode == AgentMode::Agent
            && needs_planning(prompt)
        {
            self.plan(prompt).await
        } else {
            None
        };

        self.history.push(ConversationTurn::user(prompt));
        let mut response = match self.mode {
            AgentMode::Chat => self.run_chat().await,
            AgentMode::Agent => self.run_agent().await,
        };
        if plan.is_some() {
            response.plan = self.current_plan.clone();
        }
        response
    }

    async fn run_chat(&mut self) -> AgentResponse {
        self.state = AgentState::AwaitingLlm;
        match self.call_llm().await {
            Ok(text) => {
                self.history.push(ConversationTurn::assistant(text.clone()));
                self.state = AgentState::FinalResponse;
                self.respond(text, Vec::new(), 1)
            }
            Err(err) => self.provider_failure(&err, Vec::new(), 1),
        }
    }

    async fn run_agent(&mut self) -> AgentResponse {
        let max_iterations = self.settings.max_iterations;
        let mut tool_calls: Vec<ToolResult> = Vec::new();
        let mut last_clean = String::new();

        for iteration in 1..=max_iterations {
            self.state = AgentState::AwaitingLlm;
            let reply = match self.call_llm().await {
                Ok(reply) => reply,
                Err(err) => return self.provider_failure(&err, tool_calls, iteration),
            };

            let Some(raw_call) = extract_tool_call(&reply) else {
                let visible = strip_tool_call_fences(&reply);
                self.history.push(ConversationTurn::assistant(reply));
                self.state = AgentState::FinalResponse;
                tracing::debug!(iteration, tools = tool_calls.len(), "final response");
                return self.respond(visible, tool_calls, iteration);
            };

            self.state = AgentState::ToolCallPending;
            let clean = strip_tool_call_fences(&reply);
            if clean != reply.trim() {
                last_clean = clean;
            }

            let result = self.execute_tool_call(&raw_call).await;
            self.history.push(ConversationTurn::assistant(reply));
            self.history
                .push(ConversationTurn::user(format!("Tool result: {}", result.result)));
            if let Some(plan) = self.current_plan.as_mut() {
                if let Some(step) = plan.mark_tool_completed(&result.tool) {
                    tracing::debug!(step, tool = %result.tool, "plan step completed");
                }
            }
            tool_calls.push(result);
        }

        tracing::warn!(max_iterations, "iteration limit reached");
        let notice = format!(
            "Stopped after reaching the iteration limit: completed {} operations.",
            tool_calls.len()
        );
        let text = if last_clean.is_empty() {
            notice
        } else {
            format!("{notice}\n\n{last_clean}")
        };
        self.state = AgentState::FinalResponse;
        self.respond(text, tool_calls, max_iterations)
    }

    fn respond(&self, response: String, tool_calls: Vec<ToolResult>, iterations: usize) -> AgentResponse {
        AgentResponse {
            response,
            tool_calls,
            iterations,
            mode: self.mode,
            plan: None,
        }
    }

    fn provider_failure(
        &mut self,
        err: &ModelError,
        tool_calls: Vec<ToolResult>,
        iterations: usize,
    ) -> AgentResponse {
        tracing::error!(provider = self.model.provider_name(), error = %err, "model call failed");
        let text = format!(
            "Failed to get response from {} - no response received ({err})",
            self.model.provider_name()
        );
        self.state = AgentState::FinalResponse;
        self.respond(text, tool_calls, iterations)
    }

    fn system_prompt(&self) -> String {
        match self.mode {
            AgentMode::Chat => CHAT_SYSTEM_PROMPT.to_string(),
            AgentMode::Agent => agent_system_prompt(
                &self.tools.middleware().tool_help(None),
                self.policy.workspace_root(),
            ),
        }
    }

    async fn call_llm(&self) -> Result<String, ModelError> {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(ConversationTurn::system(self.system_prompt()));
        messages.extend(self.history.iter().cloned());
        self.model.chat(&messages).await
    }

    /// Normalizes and runs one extracted call. Every outcome becomes a
    /// [`ToolResult`]; nothing here returns an error.
    async fn execute_tool_call(&mut self, raw: &Value) -> ToolResult {
        let named = raw
            .get("tool")
            .and_then(Value::as_str)
            .is_some_and(|name| !name.trim().is_empty());
        if !raw.is_object() || !named {
            tracing::warn!(call = %raw, "skipping malformed tool call");
            return ToolResult::skipped(
                "unknown",
                "Error: Invalid tool call format",
                vec!["Invalid tool call format".to_string()],
            );
        }

        let (tool, args, warnings) = if self.settings.use_middleware {
            let (call, warnings) = self
                .tools
                .middleware()
                .normalize_tool_call(raw, Some(self.policy.workspace_root()));
            for warning in &warnings {
                tracing::info!(tool = %call.tool, %warning, "tool call adjusted");
            }
            (call.tool, call.args, warnings)
        } else {
            let tool = raw
                .get("tool")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let args = match raw.get("args") {
                Some(Value::Object(args)) => args.clone(),
                _ => Map::new(),
            };
            (tool, args, Vec::new())
        };

        self.state = AgentState::ToolExecuting;
        tracing::info!(tool = %tool, "executing tool");
        let mut ctx = ToolContext::new(&self.policy, &mut self.tracker, self.config.command_timeout);
        let text = self.tools.dispatch(&tool, &args, &mut ctx).await;
        let result = ToolResult::new(tool, args, text, warnings);
        tracing::debug!(tool = %result.tool, status = %result.status, "tool finished");
        result
    }

    // -----------------------------------------------------------------------
    // Planning
    // -----------------------------------------------------------------------

    /// Asks the model for a plan without touching history. The parsed plan
    /// becomes the current plan.
    pub async fn plan(&mut self, request: &str) -> Option<AgentPlan> {
        let prompt = build_planning_prompt(request, &self.workspace_context());
        let messages = [
            ConversationTurn::system(self.system_prompt()),
            ConversationTurn::user(prompt),
        ];

        let reply = match self.model.chat(&messages).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(error = %err, "planning request failed");
                return None;
            }
        };
        let plan = parse_plan(&reply);
        match &plan {
            Some(plan) => tracing::info!(goal = %plan.goal, steps = plan.steps.len(), "plan created"),
            None => tracing::debug!("model reply contained no plan"),
        }
        self.current_plan = plan.clone();
        plan
    }

    pub fn current_plan(&self) -> Option<&AgentPlan> {
        self.current_plan.as_ref()
    }

    pub fn clear_plan(&mut self) {
        self.current_plan = None;
    }

    fn workspace_context(&self) -> String {
        let root = self.policy.workspace_root();
        let mut entries: Vec<String> = match std::fs::read_dir(root) {
            Ok(dir) => dir
                .filter_map(Result::ok)
                .map(|entry| {
                    let name = entry.file_name().to_string_lossy().to_string();
                    if entry.file_type().is_ok_and(|ft| ft.is_dir()) {
                        format!("{name}/")
                    } else {
                        name
                    }
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        entries.sort();
        entries.truncate(PLAN_CONTEXT_ENTRIES);
        if entries.is_empty() {
            format!("Workspace: {}", root.display())
        } else {
            format!("Workspace: {}\nTop-level entries: {}", root.display(), entries.join(", "))
        }
    }

    // -----------------------------------------------------------------------
    // Session settings
    // -----------------------------------------------------------------------

    pub fn mode(&self) -> AgentMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: AgentMode) {
        if self.mode != mode {
            tracing::info!(from = %self.mode, to = %mode, "mode changed");
        }
        self.mode = mode;
    }

    pub fn settings(&self) -> LoopSettings {
        self.settings
    }

    pub fn set_auto_plan(&mut self, enabled: bool) {
        self.config.auto_plan = enabled;
    }

    /// Switches provider and model. History is kept.
    pub fn set_provider(&mut self, provider: ProviderConfig) -> Result<(), AppError> {
        let model = build_client(&provider, self.config.llm_timeout)?;
        tracing::info!(provider = %provider.provider, model = %model.model_id(), "provider changed");
        self.model = model;
        self.config.provider = provider;
        Ok(())
    }

    /// Replaces the model client directly.
    pub fn set_model(&mut self, model: Box<dyn ChatModel>) {
        self.model = model;
    }

    pub fn provider(&self) -> ProviderId {
        self.config.provider.provider
    }

    pub fn model_info(&self) -> ModelSelection {
        ModelSelection {
            provider: self.model.provider_name().to_string(),
            model: self.model.model_id(),
        }
    }

    pub async fn check_provider_health(&self) -> ProviderHealth {
        let available = self.model.health_check().await;
        tracing::debug!(provider = %self.provider(), available, "provider health");
        ProviderHealth {
            available,
            provider: self.provider(),
        }
    }

    pub fn workspace(&self) -> &Path {
        self.policy.workspace_root()
    }

    /// Points the session at another directory. Tracked changes belong to the
    /// old workspace and are dropped.
    pub fn set_workspace(&mut self, workspace: impl Into<PathBuf>) -> Result<(), AppError> {
        let workspace = workspace.into();
        if !workspace.is_dir() {
            return Err(AppError::Config(format!(
                "workspace is not a directory: {}",
                workspace.display()
            )));
        }
        self.policy = PolicyEngine::with_containment(workspace.clone(), self.config.containment);
        self.tracker.clear();
        tracing::info!(workspace = %self.policy.workspace_root().display(), "workspace changed");
        self.config.workspace = workspace;
        Ok(())
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn set_tools_dir(&mut self, tools_dir: Option<PathBuf>) -> usize {
        self.config.tools_dir = tools_dir;
        self.reload_tools()
    }

    /// Rescans the tools directory. Returns the number of script tools.
    pub fn reload_tools(&mut self) -> usize {
        let registry = ToolRegistry::with_tools_dir(self.config.tools_dir.as_deref());
        let count = registry.script_names().count();
        self.tools = Arc::new(registry);
        tracing::info!(scripts = count, "tools reloaded");
        count
    }

    // -----------------------------------------------------------------------
    // Session state
    // -----------------------------------------------------------------------

    /// Random id identifying this session in logs.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn tracker(&self) -> &FileChangeTracker {
        &self.tracker
    }

    pub fn set_tracking_enabled(&mut self, enabled: bool) {
        self.tracker.set_enabled(enabled);
    }

    pub fn file_changes(&self) -> Vec<FileChange> {
        self.tracker.changes()
    }

    pub fn change_summary(&self) -> ChangeSummary {
        self.tracker.summary()
    }

    /// Unified diff for one file, or for every changed file when `path` is None.
    pub fn generate_diff(&self, path: Option<&str>) -> Option<String> {
        match path {
            Some(path) => self.tracker.diff(path),
            None => {
                let all = self.tracker.diff_all();
                (!all.is_empty()).then_some(all)
            }
        }
    }

    /// Clears history, tracked changes and the current plan.
    pub fn reset(&mut self) {
        self.history.clear();
        self.tracker.clear();
        self.current_plan = None;
        self.state = AgentState::Idle;
        tracing::info!(session = %self.session_id, "session reset");
    }
}
