use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::conversation::ConversationTurn;
use crate::model::catalog::ModelCatalog;
use crate::model::providers::{body_prefix, HEALTH_TIMEOUT};
use crate::model::{ChatModel, ModelError, ProviderId};

/// Client for a local Ollama server's native chat API.
pub struct OllamaClient {
    pub model: String,
    pub base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(
        model: Option<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Request(e.to_string()))?;
        Ok(Self {
            model: model
                .unwrap_or_else(|| ModelCatalog::default_model_for_provider(ProviderId::Ollama)),
            base_url: base_url
                .unwrap_or_else(|| ModelCatalog::default_base_url(ProviderId::Ollama)),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for OllamaClient {
    fn provider_name(&self) -> &str {
        ProviderId::Ollama.display_name()
    }

    fn model_id(&self) -> String {
        self.model.clone()
    }

    async fn chat(&self, messages: &[ConversationTurn]) -> Result<String, ModelError> {
        let body = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };

        tracing::debug!(model = %self.model, messages = messages.len(), "calling ollama chat");
        let response = self
            .client
            .post(self.endpoint("api/chat"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Request(format!("Ollama request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;

        tracing::debug!("Ollama API response: status={}", status);

        if !status.is_success() {
            return Err(ModelError::Request(format!(
                "Ollama API error ({status}): {}",
                body_prefix(&text)
            )));
        }

        let parsed: OllamaChatResponse = serde_json::from_str(&text)
            .map_err(|e| ModelError::InvalidResponse(format!("Ollama parse failed: {e}")))?;
        let content = parsed.message.map(|m| m.content).unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ModelError::Empty("Ollama".to_string()));
        }
        Ok(content)
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.endpoint("api/tags"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "ollama health check failed");
                false
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ConversationTurn],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}
