//! Default models and endpoints per provider, plus the known models listed
//! by the terminal front-end.

use crate::model::provider::ProviderId;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub context_window: u32,
    pub description: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProviderEntry {
    pub provider: String,
    pub models: Vec<ModelInfo>,
}

fn model(name: &str, context_window: u32, description: &str) -> ModelInfo {
    ModelInfo {
        name: name.to_string(),
        context_window,
        description: description.to_string(),
    }
}

/// Full model catalog.
pub struct ModelCatalog;

impl ModelCatalog {
    /// Get all known models for all providers.
    pub fn all_models() -> Vec<ProviderEntry> {
        vec![
            ProviderEntry {
                provider: ProviderId::Groq.as_str().to_string(),
                models: vec![
                    model("llama-3.3-70b-versatile", 131_072, "Llama 3.3 70B on Groq"),
                    model("llama-3.1-8b-instant", 131_072, "Small, fast Llama 3.1"),
                ],
            },
            ProviderEntry {
                provider: ProviderId::Ollama.as_str().to_string(),
                models: vec![
                    model("llama3.2:3b", 131_072, "Local Llama 3.2 3B"),
                    model("qwen2.5-coder:7b", 32_768, "Local coding model"),
                ],
            },
            ProviderEntry {
                provider: ProviderId::OpenAi.as_str().to_string(),
                models: vec![
                    model("gpt-4o-mini", 128_000, "OpenAI small general model"),
                    model("gpt-4o", 128_000, "OpenAI flagship model"),
                ],
            },
        ]
    }

    /// Get the default model for a provider.
    pub fn default_model_for_provider(provider: ProviderId) -> String {
        match provider {
            ProviderId::Groq => "llama-3.3-70b-versatile".to_string(),
            ProviderId::Ollama => "llama3.2:3b".to_string(),
            ProviderId::OpenAi => "gpt-4o-mini".to_string(),
        }
    }

    /// Default API base for a provider. OpenAI-compatible bases end in `/v1`.
    pub fn default_base_url(provider: ProviderId) -> String {
        match provider {
            ProviderId::Groq => "https://api.groq.com/openai/v1".to_string(),
            ProviderId::Ollama => "http://localhost:11434".to_string(),
            ProviderId::OpenAi => "https://api.openai.com/v1".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_provider_has_its_default_in_the_catalog() {
        let all = ModelCatalog::all_models();
        for provider in ProviderId::all() {
            let entry = all
                .iter()
                .find(|e| e.provider == provider.as_str())
                .unwrap();
            let default = ModelCatalog::default_model_for_provider(*provider);
            assert!(entry.models.iter().any(|m| m.name == default), "{provider}");
        }
    }
}
