//! LLM provider identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    #[default]
    Groq,
    Ollama,
    #[serde(rename = "openai", alias = "open_ai")]
    OpenAi,
}

impl ProviderId {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Groq => "groq",
            ProviderId::Ollama => "ollama",
            ProviderId::OpenAi => "openai",
        }
    }

    /// Human-facing name used in status lines and failure text.
    pub const fn display_name(&self) -> &'static str {
        match self {
            ProviderId::Groq => "Groq",
            ProviderId::Ollama => "Ollama",
            ProviderId::OpenAi => "OpenAI",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::Groq, ProviderId::Ollama, ProviderId::OpenAi]
    }

    /// Whether requests carry a bearer key.
    pub const fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderId::Ollama)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if wanted == "open_ai" {
            return Ok(ProviderId::OpenAi);
        }
        ProviderId::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| format!("unknown provider '{s}' (expected groq, ollama or openai)"))
    }
}

/// Splits `groq/llama-3.3-70b-versatile` into provider and model. Only a
/// known provider prefix is split off, so `library/llama3` stays whole.
pub fn parse_model_override(value: &str) -> (Option<ProviderId>, String) {
    let value = value.trim();
    let split = value.split_once('/').and_then(|(prefix, rest)| {
        let provider = prefix.parse::<ProviderId>().ok()?;
        let rest = rest.trim();
        (!rest.is_empty()).then(|| (provider, rest.to_string()))
    });
    match split {
        Some((provider, model)) => (Some(provider), model),
        None => (None, value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!(ProviderId::from_str("groq").unwrap(), ProviderId::Groq);
        assert_eq!(ProviderId::from_str("Ollama").unwrap(), ProviderId::Ollama);
        assert_eq!(ProviderId::from_str("OPENAI").unwrap(), ProviderId::OpenAi);
        assert_eq!(ProviderId::from_str(" groq ").unwrap(), ProviderId::Groq);
        assert_eq!(ProviderId::from_str("open_ai").unwrap(), ProviderId::OpenAi);
        assert!(ProviderId::from_str("minimax").is_err());
    }

    #[test]
    fn model_override_splits_known_prefix_only() {
        let (provider, model) = parse_model_override("ollama/llama3.2:3b");
        assert_eq!(provider, Some(ProviderId::Ollama));
        assert_eq!(model, "llama3.2:3b");

        let (provider, model) = parse_model_override("llama-3.3-70b-versatile");
        assert_eq!(provider, None);
        assert_eq!(model, "llama-3.3-70b-versatile");

        let (provider, model) = parse_model_override("library/llama3");
        assert_eq!(provider, None);
        assert_eq!(model, "library/llama3");
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ProviderId::OpenAi).unwrap();
        assert_eq!(json, "\"openai\"");
        let parsed: ProviderId = serde_json::from_str("\"ollama\"").unwrap();
        assert_eq!(parsed, ProviderId::Ollama);
        let parsed: ProviderId = serde_json::from_str("\"open_ai\"").unwrap();
        assert_eq!(parsed, ProviderId::OpenAi);
    }
}
