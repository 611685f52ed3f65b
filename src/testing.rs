//! Test doubles shared by the scenario suites.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::config::AgentConfig;
use crate::core::conversation::ConversationTurn;
use crate::model::{ChatModel, ModelError};
use crate::runtime::agent_loop::{AgentLoop, AgentMode};

/// Every message list the model was called with, oldest first.
pub type RequestLog = Arc<Mutex<Vec<Vec<ConversationTurn>>>>;

/// Model stub that replays canned replies in order. An exhausted script
/// answers with [`ModelError::Empty`].
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    requests: RequestLog,
    healthy: bool,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(replies.into_iter().map(|r| Ok(r.into())))
    }

    pub fn with_results(replies: impl IntoIterator<Item = Result<String, ModelError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Arc::default(),
            healthy: true,
        }
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Handle to the request log; take it before boxing the model.
    pub fn requests(&self) -> RequestLog {
        self.requests.clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn provider_name(&self) -> &str {
        "Scripted"
    }

    fn model_id(&self) -> String {
        "scripted-1".to_string()
    }

    async fn chat(&self, messages: &[ConversationTurn]) -> Result<String, ModelError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Empty("Scripted".to_string())))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }
}

/// A reply carrying one fenced tool call.
pub fn tool_reply(tool: &str, args: Value) -> String {
    let call = serde_json::json!({ "tool": tool, "args": args });
    format!("```tool\n{call}\n```")
}

/// Agent-mode loop over `workspace` driven by `model`.
pub fn agent_in(workspace: &Path, model: ScriptedModel) -> AgentLoop {
    AgentLoop::with_model(AgentConfig::for_workspace(workspace), Box::new(model))
        .with_mode(AgentMode::Agent)
}
