//! Traits for model clients.

use async_trait::async_trait;

use crate::core::conversation::ConversationTurn;
use crate::model::types::ModelError;

/// The only thing the agent loop needs from an LLM: send an ordered message
/// sequence (system prompt first) and get text back.
/// Implemented by [`OpenAiCompatClient`](crate::model::OpenAiCompatClient) and
/// [`OllamaClient`](crate::model::OllamaClient).
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Display name, e.g. "Groq".
    fn provider_name(&self) -> &str;
    fn model_id(&self) -> String;
    async fn chat(&self, messages: &[ConversationTurn]) -> Result<String, ModelError>;
    /// Cheap reachability probe. Never errors; unreachable is `false`.
    async fn health_check(&self) -> bool;
}
