//! LocLM agent library.
//!
//! A single-session coding agent: natural-language requests go to an LLM,
//! tool calls embedded in its replies are normalized and executed inside a
//! workspace, and file changes are tracked for diff review.
//!
//! # Architecture
//!
//! - `config`: explicit session configuration, read once from the environment
//! - `runtime`: agent loop, planner, prompts and file change tracking
//! - `tools`: schema catalog, call middleware and tool implementations
//! - `model`: LLM clients (Groq, OpenAI, Ollama) and tool-call extraction
//! - `policy`: workspace path containment
//! - `core`: shared types

pub mod config;
pub mod core;
pub mod model;
pub mod policy;
pub mod runtime;
pub mod tools;

#[cfg(test)]
mod testing;

#[cfg(test)]
mod tests;

pub use config::{AgentConfig, ProviderConfig};
pub use runtime::agent_loop::{AgentLoop, AgentMode, AgentResponse, AgentState, LoopSettings};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "loclm=debug,info";

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    Model(#[from] model::ModelError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl serde::Serialize for AppError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Installs the global tracing subscriber, logging to stderr. Calling it
/// again is a no-op.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
