//! Error types for Shade core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid account ID: {0}")]
    InvalidAccountId(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Failed to decode {field}: {reason}")]
    Decoding { field: &'static str, reason: String },

    #[error("No agent keys available")]
    NoKeysAvailable,

    #[error("Signing failed: {0}")]
    Signing(String),
}

impl Error {
    /// Build a decoding error for a named attestation field
    pub fn decoding(field: &'static str, reason: impl ToString) -> Self {
        Error::Decoding {
            field,
            reason: reason.to_string(),
        }
    }
}
