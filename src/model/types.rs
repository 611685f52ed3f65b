//! Model types shared by provider clients.

use crate::model::provider::ProviderId;

/// Result of probing a provider endpoint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ProviderHealth {
    pub available: bool,
    pub provider: ProviderId,
}

/// Provider and model currently serving a session.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ModelSelection {
    pub provider: String,
    pub model: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("empty response from {0}")]
    Empty(String),
}
