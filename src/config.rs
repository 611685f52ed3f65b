//! Session configuration.
//!
//! Everything the agent loop needs is carried in [`AgentConfig`], read once
//! from the environment at startup. Nothing below the binary looks at the
//! environment directly.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::ProviderId;
use crate::policy::ContainmentMode;
use crate::AppError;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_ITERATIONS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: ProviderId,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// None selects the catalog default.
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            api_key: String::new(),
            model: None,
            base_url: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        if model.is_some() {
            self.model = model;
        }
        self
    }

    /// Reads the provider's key, model and endpoint variables.
    pub fn from_lookup(provider: ProviderId, lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let (key_var, model_var, url_var) = match provider {
            ProviderId::Groq => (Some("GROQ_API_KEY"), "GROQ_MODEL", "GROQ_BASE_URL"),
            ProviderId::Ollama => (None, "OLLAMA_MODEL", "OLLAMA_URL"),
            ProviderId::OpenAi => (Some("OPENAI_API_KEY"), "OPENAI_MODEL", "OPENAI_BASE_URL"),
        };
        Self {
            provider,
            api_key: key_var.and_then(|var| non_empty(lookup, var)).unwrap_or_default(),
            model: non_empty(lookup, model_var),
            base_url: non_empty(lookup, url_var),
        }
    }

    pub fn from_env(provider: ProviderId) -> Self {
        Self::from_lookup(provider, &|key| std::env::var(key).ok())
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub provider: ProviderConfig,
    pub workspace: PathBuf,
    /// Directory scanned for script tools; None disables them.
    pub tools_dir: Option<PathBuf>,
    pub command_timeout: Duration,
    pub llm_timeout: Duration,
    pub max_iterations: usize,
    pub auto_plan: bool,
    pub containment: ContainmentMode,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::new(ProviderId::default()),
            workspace: default_workspace_root(),
            tools_dir: None,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            llm_timeout: DEFAULT_LLM_TIMEOUT,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            auto_plan: false,
            containment: ContainmentMode::default(),
        }
    }
}

impl AgentConfig {
    pub fn for_workspace(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset and blank values take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let provider = match non_empty(&lookup, "LLM_PROVIDER") {
            Some(raw) => ProviderId::from_str(&raw).map_err(AppError::Config)?,
            None => ProviderId::default(),
        };

        let mut config = Self {
            provider: ProviderConfig::from_lookup(provider, &lookup),
            tools_dir: non_empty(&lookup, "LOCLM_TOOLS_DIR").map(PathBuf::from),
            ..Self::default()
        };
        if let Some(workspace) = non_empty(&lookup, "LOCLM_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "LOCLM_COMMAND_TIMEOUT_SECS")? {
            config.command_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "LOCLM_LLM_TIMEOUT_SECS")? {
            config.llm_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = parse_var::<usize>(&lookup, "LOCLM_MAX_ITERATIONS")? {
            if max == 0 {
                return Err(AppError::Config(
                    "LOCLM_MAX_ITERATIONS must be at least 1".to_string(),
                ));
            }
            config.max_iterations = max;
        }
        if let Some(flag) = parse_flag(&lookup, "LOCLM_AUTO_PLAN")? {
            config.auto_plan = flag;
        }
        if parse_flag(&lookup, "LOCLM_STRICT_PATHS")?.unwrap_or(false) {
            config.containment = ContainmentMode::Reject;
        }

        tracing::debug!(
            provider = %config.provider.provider,
            workspace = %config.workspace.display(),
            max_iterations = config.max_iterations,
            "configuration loaded"
        );
        Ok(config)
    }
}

fn default_workspace_root() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, AppError> {
    non_empty(lookup, key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| AppError::Config(format!("invalid value for {key}: {raw}")))
        })
        .transpose()
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<bool>, AppError> {
    non_empty(lookup, key)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::Config(format!("invalid value for {key}: {raw}"))),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AgentConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.provider.provider, ProviderId::Groq);
        assert!(config.provider.api_key.is_empty());
        assert_eq!(config.command_timeout, Duration::from_secs(30));
        assert_eq!(config.llm_timeout, Duration::from_secs(60));
        assert_eq!(config.max_iterations, 15);
        assert!(!config.auto_plan);
        assert_eq!(config.containment, ContainmentMode::Substitute);
        assert!(config.tools_dir.is_none());
    }

    #[test]
    fn reads_provider_specific_variables() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("LLM_PROVIDER", "ollama"),
            ("OLLAMA_URL", "http://box:11434"),
            ("OLLAMA_MODEL", "qwen2.5-coder:7b"),
            ("GROQ_API_KEY", "ignored"),
        ]))
        .unwrap();
        assert_eq!(config.provider.provider, ProviderId::Ollama);
        assert_eq!(config.provider.base_url.as_deref(), Some("http://box:11434"));
        assert_eq!(config.provider.model.as_deref(), Some("qwen2.5-coder:7b"));
        assert!(config.provider.api_key.is_empty());
    }

    #[test]
    fn reads_loop_settings() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("LOCLM_WORKSPACE", "/tmp/ws"),
            ("LOCLM_TOOLS_DIR", "/tmp/tools"),
            ("LOCLM_COMMAND_TIMEOUT_SECS", "5"),
            ("LOCLM_MAX_ITERATIONS", "3"),
            ("LOCLM_AUTO_PLAN", "yes"),
            ("LOCLM_STRICT_PATHS", "1"),
        ]))
        .unwrap();
        assert_eq!(config.workspace, PathBuf::from("/tmp/ws"));
        assert_eq!(config.tools_dir, Some(PathBuf::from("/tmp/tools")));
        assert_eq!(config.command_timeout, Duration::from_secs(5));
        assert_eq!(config.max_iterations, 3);
        assert!(config.auto_plan);
        assert_eq!(config.containment, ContainmentMode::Reject);
    }

    #[test]
    fn blank_values_are_unset() {
        let config = AgentConfig::from_lookup(lookup(&[("GROQ_MODEL", "   ")])).unwrap();
        assert!(config.provider.model.is_none());
    }

    #[test]
    fn invalid_values_are_config_errors() {
        assert!(matches!(
            AgentConfig::from_lookup(lookup(&[("LLM_PROVIDER", "skynet")])),
            Err(AppError::Config(_))
        ));
        assert!(AgentConfig::from_lookup(lookup(&[("LOCLM_MAX_ITERATIONS", "zero")])).is_err());
        assert!(AgentConfig::from_lookup(lookup(&[("LOCLM_MAX_ITERATIONS", "0")])).is_err());
        assert!(AgentConfig::from_lookup(lookup(&[("LOCLM_AUTO_PLAN", "maybe")])).is_err());
    }

    #[test]
    fn with_model_keeps_existing_when_none() {
        let cfg = ProviderConfig::new(ProviderId::Groq).with_model(Some("a".into()));
        assert_eq!(cfg.clone().with_model(None).model.as_deref(), Some("a"));
    }
}
