//! Shade Agent - key lifecycle and attestation registration
//!
//! The agent derives its account key (from the TEE when one is available),
//! keeps the number of keys authorized on that account at the configured
//! count, rotates through those keys when signing, and registers with the
//! verifier contract using TEE attestation evidence.
//!
//! Chain access and the TEE are reached through the [`ChainProvider`] and
//! [`TeeSource`] traits, so the transport is the caller's choice.

pub mod agent;
pub mod config;
pub mod error;
pub mod provider;
pub mod reconcile;
pub mod setup;
pub mod submit;
pub mod tee;

pub use agent::Agent;
pub use config::{AgentConfig, Network, RpcRetrySettings, SponsorConfig};
pub use error::{AgentError, Result};
pub use provider::{
    AccessKeyPermission, Account, Action, ChainProvider, ProviderError, Transaction, TxFailure,
    TxStatus,
};
pub use reconcile::{manage_key_setup, ReconciliationResult};
pub use setup::{ensure_keys_setup, KeySetup, SetupOutcome, SetupRequest, SetupState};
pub use submit::{
    add_keys_to_account, internal_fund_agent, register_agent, remove_keys_from_account,
    submit_with_retry, RetryPolicy, SubmitKind,
};
pub use tee::{collect_attestation, generate_agent, TeeSource};
