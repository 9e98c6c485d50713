//! Shade Core - agent key material, derivation and attestation canonicalization
//!
//! This crate holds the transport-free parts of the Shade agent: key types and
//! their chain string encodings, seed derivation, round-robin signer rotation,
//! and the conversion of TEE attestation evidence into the verifier contract's
//! wire form.

pub mod attestation;
pub mod derivation;
pub mod error;
pub mod keys;
pub mod rotation;
pub mod types;

pub use attestation::{
    attestation_for_contract, fake_attestation, transform_collateral, transform_quote,
    transform_tcb_info, AttestationEvidence, Collateral, ContractAttestation, EventLog,
    RawCollateral, RawTcbInfo, TcbInfo,
};
pub use derivation::AgentIdentity;
pub use error::{Error, Result};
pub use keys::{KeyAlgorithm, KeyMaterial, KeySignature, Provenance, PublicKey, Signer};
pub use rotation::{get_agent_signer, AgentSigner};
pub use types::{AccountId, NearToken};

/// Path passed to the TEE when requesting hardware-rooted key material
pub const TEE_KEY_PATH: &str = "shade-agent";
