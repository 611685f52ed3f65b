//! Model clients for LLM providers.
//!
//! ## Structure
//!
//! - `types`: errors, health and selection views
//! - `traits`: the [`ChatModel`] boundary the agent loop depends on
//! - `provider`: Provider ID enum and parsing
//! - `catalog`: Model metadata and defaults
//! - `extract`: tool-call extraction from model text
//! - `providers/`: Provider-specific implementations and the client factory

pub mod types;
pub mod traits;
pub mod provider;
pub mod catalog;
pub mod extract;

// Provider implementations
pub mod providers;

// Re-export commonly used types
pub use types::{ModelError, ModelSelection, ProviderHealth};
pub use traits::ChatModel;
pub use provider::{parse_model_override, ProviderId};
pub use catalog::ModelCatalog;
pub use extract::{extract_tool_call, strip_tool_call_fences};

// Re-export provider clients for convenience
pub use providers::build_client;
pub use providers::ollama::OllamaClient;
pub use providers::openai_compat::OpenAiCompatClient;
