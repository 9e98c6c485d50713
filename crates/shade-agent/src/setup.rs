//! One-time key setup at agent start
//!
//! Reconciliation runs once per process. [`SetupState`] records that it has
//! run so later calls return immediately without touching the chain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::{CryptoRng, RngCore};
use shade_core::{AccountId, KeyMaterial};
use tracing::{debug, info};

use crate::error::{AgentError, Result};
use crate::provider::{Account, ChainProvider};
use crate::reconcile::manage_key_setup;
use crate::submit::RetryPolicy;
use crate::tee::TeeSource;

/// Whether key setup has completed in this process
///
/// Concurrent first calls may both reconcile; callers serialize setup.
#[derive(Debug, Default)]
pub struct SetupState {
    keys_checked: AtomicBool,
}

impl SetupState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_checked(&self) -> bool {
        self.keys_checked.load(Ordering::Acquire)
    }

    pub fn mark_checked(&self) {
        self.keys_checked.store(true, Ordering::Release);
    }

    #[cfg(test)]
    pub fn reset(&self) {
        self.keys_checked.store(false, Ordering::Release);
    }
}

/// Inputs for one setup run
pub struct SetupRequest<'a> {
    pub account_id: AccountId,
    pub provider: Arc<dyn ChainProvider>,
    /// Keys already held; the first one signs the reconciliation transactions
    pub existing_keys: &'a [KeyMaterial],
    /// Desired total number of authorized keys
    pub num_keys: usize,
    pub first_key_was_tee: bool,
    pub tee: Option<&'a dyn TeeSource>,
    pub derivation_path: Option<&'a str>,
    pub policy: RetryPolicy,
}

/// Result of a setup run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupOutcome {
    /// Keys added on-chain during this run
    pub keys_to_add: Vec<KeyMaterial>,
    /// Held keys authorized after this run; empty when the run was skipped
    pub keys_to_save: Vec<KeyMaterial>,
    pub was_checked: bool,
}

/// Reconcile the agent's keys unless `keys_checked` says it already happened
pub async fn ensure_keys_setup<R>(
    request: SetupRequest<'_>,
    keys_checked: bool,
    rng: &mut R,
) -> Result<SetupOutcome>
where
    R: RngCore + CryptoRng + Send,
{
    if keys_checked {
        debug!("Keys already checked, skipping setup");
        return Ok(SetupOutcome {
            was_checked: true,
            ..SetupOutcome::default()
        });
    }

    if request.first_key_was_tee && request.tee.is_none() {
        return Err(AgentError::ProvenanceMismatch(
            "First key was derived with TEE but additional keys were not".to_string(),
        ));
    }

    let first_key = request
        .existing_keys
        .first()
        .ok_or(AgentError::NoKeysAvailable)?;
    let account = Account::new(
        request.account_id.clone(),
        request.provider.clone(),
        first_key.signer(),
    );

    let result = manage_key_setup(
        &account,
        request.existing_keys,
        request.num_keys,
        request.tee,
        request.derivation_path,
        rng,
        &request.policy,
    )
    .await?;

    info!(
        "Key setup for {} complete: {} added, {} held",
        request.account_id,
        result.added.len(),
        result.keys_to_save.len()
    );
    Ok(SetupOutcome {
        keys_to_add: result.added,
        keys_to_save: result.keys_to_save,
        was_checked: true,
    })
}

/// Runs [`ensure_keys_setup`] at most once successfully
#[derive(Debug, Default)]
pub struct KeySetup {
    state: SetupState,
}

impl KeySetup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SetupState {
        &self.state
    }

    pub async fn run<R>(&self, request: SetupRequest<'_>, rng: &mut R) -> Result<SetupOutcome>
    where
        R: RngCore + CryptoRng + Send,
    {
        let outcome = ensure_keys_setup(request, self.state.is_checked(), rng).await?;
        self.state.mark_checked();
        Ok(outcome)
    }
}
