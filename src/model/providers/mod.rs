//! Provider-specific clients and construction from configuration.

use std::time::Duration;

use crate::config::ProviderConfig;
use crate::model::{ChatModel, ModelError, ProviderId};

pub mod ollama;
pub mod openai_compat;

/// Timeout for reachability probes, independent of the chat timeout.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const ERROR_BODY_CHARS: usize = 200;

/// First few hundred characters of an error body, enough to identify it.
pub(crate) fn body_prefix(text: &str) -> String {
    text.chars().take(ERROR_BODY_CHARS).collect()
}

/// Builds the client for `config`. Missing API keys are not an error here;
/// the provider reports them on the first request.
pub fn build_client(
    config: &ProviderConfig,
    timeout: Duration,
) -> Result<Box<dyn ChatModel>, ModelError> {
    if config.provider.requires_api_key() && config.api_key.is_empty() {
        tracing::warn!(provider = %config.provider, "no API key configured");
    }
    let client: Box<dyn ChatModel> = match config.provider {
        ProviderId::Groq | ProviderId::OpenAi => Box::new(openai_compat::OpenAiCompatClient::new(
            config.provider,
            config.api_key.clone(),
            config.model.clone(),
            config.base_url.clone(),
            timeout,
        )?),
        ProviderId::Ollama => Box::new(ollama::OllamaClient::new(
            config.model.clone(),
            config.base_url.clone(),
            timeout,
        )?),
    };
    tracing::info!(provider = %config.provider, model = %client.model_id(), "model client ready");
    Ok(client)
}
