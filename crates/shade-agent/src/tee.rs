//! TEE boundary, key generation and attestation collection
//!
//! Inside a TEE the agent seeds its keys from hardware-rooted key material and
//! attests with a real quote. Outside one it falls back to path or random seeds
//! and the zero-filled evidence, which only a verifier that does not require a
//! TEE will accept.

use async_trait::async_trait;
use rand::{CryptoRng, RngCore};
use shade_core::derivation::{derive_from_hardware, derive_from_path, derive_random};
use shade_core::{
    fake_attestation, transform_collateral, transform_quote, transform_tcb_info, AgentIdentity,
    AttestationEvidence, RawCollateral, RawTcbInfo, TEE_KEY_PATH,
};
use tracing::{debug, warn};

use crate::error::Result;

/// Source of TEE key material and attestation evidence
///
/// Implementations report failures as [`AgentError::DerivationFailure`](crate::AgentError::DerivationFailure).
#[async_trait]
pub trait TeeSource: Send + Sync {
    /// Hardware-rooted key material for `path`
    async fn get_key(&self, path: &str) -> Result<Vec<u8>>;

    /// Hex-encoded quote binding `report_data`
    async fn get_quote(&self, report_data: &[u8]) -> Result<String>;

    /// TCB info of the running workload
    async fn info(&self) -> Result<RawTcbInfo>;

    /// Collateral needed to verify `quote_hex`
    async fn quote_collateral(&self, quote_hex: &str) -> Result<RawCollateral>;
}

/// Derive a fresh agent identity
///
/// Order of preference: TEE key material mixed with a nonce, then the
/// derivation path, then pure randomness.
pub async fn generate_agent<R>(
    tee: Option<&dyn TeeSource>,
    derivation_path: Option<&str>,
    rng: &mut R,
) -> Result<AgentIdentity>
where
    R: RngCore + CryptoRng + Send,
{
    let identity = match (tee, derivation_path) {
        (Some(tee), _) => {
            let hardware_key = tee.get_key(TEE_KEY_PATH).await?;
            derive_from_hardware(&hardware_key, rng)?
        }
        (None, Some(path)) => derive_from_path(path)?,
        (None, None) => derive_random(rng)?,
    };
    debug!(
        "Generated agent {} (tee: {})",
        identity.account_id, identity.derived_with_tee
    );
    Ok(identity)
}

/// Gather attestation evidence for `report_data`
///
/// Without a TEE this returns the zero-filled fallback evidence.
pub async fn collect_attestation(
    tee: Option<&dyn TeeSource>,
    report_data: &[u8],
) -> Result<AttestationEvidence> {
    let Some(tee) = tee else {
        warn!("No TEE available, using fallback attestation");
        return Ok(fake_attestation());
    };

    let quote_hex = tee.get_quote(report_data).await?;
    let quote = transform_quote(&quote_hex)?;
    let collateral = transform_collateral(&tee.quote_collateral(&quote_hex).await?)?;
    let tcb_info = transform_tcb_info(&tee.info().await?)?;

    debug!("Collected attestation with {} byte quote", quote.len());
    Ok(AttestationEvidence {
        quote,
        collateral,
        tcb_info,
    })
}
