//! Error types for the Shade agent

use thiserror::Error;

use crate::provider::{ProviderError, TxFailure};

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can occur in the agent
#[derive(Debug, Error)]
pub enum AgentError {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] shade_core::Error),

    /// Chain provider error outside of transaction submission
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The TEE failed to hand out key material or evidence
    #[error("Derivation failed: {0}")]
    DerivationFailure(String),

    /// New keys would not match the provenance of the existing set
    #[error("{0}")]
    ProvenanceMismatch(String),

    #[error("No agent keys available")]
    NoKeysAvailable,

    /// Desired key count must be at least one
    #[error("Invalid key count: {0}")]
    InvalidKeyCount(usize),

    /// Transaction still failing after every retry
    #[error("{message}")]
    Submission {
        message: String,
        /// Structured chain failure of the last attempt, if it got that far
        failure: Option<TxFailure>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::Serialization(e.to_string())
    }
}
