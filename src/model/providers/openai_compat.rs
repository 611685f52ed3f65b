use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::conversation::ConversationTurn;
use crate::model::catalog::ModelCatalog;
use crate::model::providers::{body_prefix, HEALTH_TIMEOUT};
use crate::model::{ChatModel, ModelError, ProviderId};

pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 4096;

/// Client for OpenAI-style `/chat/completions` endpoints (Groq, OpenAI).
pub struct OpenAiCompatClient {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    client: reqwest::Client,
    provider: ProviderId,
}

impl OpenAiCompatClient {
    pub fn new(
        provider: ProviderId,
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Request(e.to_string()))?;
        Ok(Self {
            api_key,
            model: model.unwrap_or_else(|| ModelCatalog::default_model_for_provider(provider)),
            base_url: base_url.unwrap_or_else(|| ModelCatalog::default_base_url(provider)),
            client,
            provider,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            request
        } else {
            request.header("Authorization", format!("Bearer {}", self.api_key))
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatClient {
    fn provider_name(&self) -> &str {
        self.provider.display_name()
    }

    fn model_id(&self) -> String {
        self.model.clone()
    }

    async fn chat(&self, messages: &[ConversationTurn]) -> Result<String, ModelError> {
        let name = self.provider.display_name();
        let body = OpenAiChatRequest {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        tracing::debug!(provider = name, model = %self.model, messages = messages.len(), "calling chat completions");
        let response = self
            .authorize(self.client.post(self.endpoint("chat/completions")))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Request(format!("{name} request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;

        tracing::debug!("{} API response: status={}", name, status);

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ModelError::Auth(format!(
                "{name} auth failed ({status}). Check API key and account access."
            )));
        }
        if !status.is_success() {
            return Err(ModelError::Request(format!(
                "{name} API error ({status}): {}",
                body_prefix(&text)
            )));
        }

        let parsed: OpenAiChatResponse = serde_json::from_str(&text)
            .map_err(|e| ModelError::InvalidResponse(format!("{name} parse failed: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ModelError::Empty(name.to_string()));
        }
        Ok(content)
    }

    async fn health_check(&self) -> bool {
        let result = self
            .authorize(self.client.get(self.endpoint("models")))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await;
        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(provider = self.provider.as_str(), error = %e, "health check failed");
                false
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: &'a [ConversationTurn],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_come_from_catalog() {
        let client =
            OpenAiCompatClient::new(ProviderId::Groq, "k".into(), None, None, Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.model, "llama-3.3-70b-versatile");
        assert_eq!(
            client.endpoint("chat/completions"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn request_body_shape() {
        let messages = vec![ConversationTurn::system("s"), ConversationTurn::user("hi")];
        let body = OpenAiChatRequest {
            model: "m",
            messages: &messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert_eq!(value["max_tokens"], 4096);
    }
}
