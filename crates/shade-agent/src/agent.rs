//! Agent facade
//!
//! Ties the pieces together for a running agent: derive the primary identity,
//! fund it from the sponsor, reconcile its key set once, then hand out signers
//! round-robin and register with the verifier contract.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::{CryptoRng, RngCore};
use shade_core::{
    attestation_for_contract, get_agent_signer, AccountId, AgentIdentity, AgentSigner,
    ContractAttestation, KeyMaterial, NearToken, Signer,
};
use tracing::info;

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::provider::{Account, ChainProvider};
use crate::setup::{KeySetup, SetupRequest};
use crate::submit::{internal_fund_agent, register_agent};
use crate::tee::{collect_attestation, generate_agent, TeeSource};

pub struct Agent {
    config: AgentConfig,
    provider: Arc<dyn ChainProvider>,
    tee: Option<Arc<dyn TeeSource>>,
    identity: AgentIdentity,
    keys: Vec<KeyMaterial>,
    key_index: AtomicUsize,
    setup: KeySetup,
}

impl Agent {
    /// Derive, fund and set up a new agent
    pub async fn create<R>(
        config: AgentConfig,
        provider: Arc<dyn ChainProvider>,
        tee: Option<Arc<dyn TeeSource>>,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: RngCore + CryptoRng + Send,
    {
        config.validate()?;

        let identity =
            generate_agent(tee.as_deref(), config.derivation_path.as_deref(), rng).await?;
        info!(
            "Agent account {} (derived with TEE: {})",
            identity.account_id, identity.derived_with_tee
        );

        if let Some(sponsor) = config.sponsor_account(provider.clone())? {
            internal_fund_agent(
                &sponsor,
                &identity.account_id,
                config.fund_amount()?,
                &config.retry,
            )
            .await?;
        }

        let mut agent = Self {
            keys: vec![identity.key.clone()],
            config,
            provider,
            tee,
            identity,
            key_index: AtomicUsize::new(0),
            setup: KeySetup::new(),
        };
        agent.ensure_keys(rng).await?;
        Ok(agent)
    }

    /// Reconcile the key set if it has not been reconciled yet
    pub async fn ensure_keys<R>(&mut self, rng: &mut R) -> Result<()>
    where
        R: RngCore + CryptoRng + Send,
    {
        let request = SetupRequest {
            account_id: self.identity.account_id.clone(),
            provider: self.provider.clone(),
            existing_keys: &self.keys,
            num_keys: self.config.num_keys,
            first_key_was_tee: self.identity.derived_with_tee,
            tee: self.tee.as_deref(),
            derivation_path: self.config.derivation_path.as_deref(),
            policy: self.config.retry,
        };
        let outcome = self.setup.run(request, rng).await?;
        if !outcome.keys_to_save.is_empty() {
            self.keys = outcome.keys_to_save;
            self.key_index.store(0, Ordering::Relaxed);
        }
        Ok(())
    }

    pub fn account_id(&self) -> &AccountId {
        &self.identity.account_id
    }

    pub fn derived_with_tee(&self) -> bool {
        self.identity.derived_with_tee
    }

    /// Keys the agent signs with, in rotation order
    pub fn keys(&self) -> &[KeyMaterial] {
        &self.keys
    }

    pub async fn balance(&self) -> Result<NearToken> {
        Ok(self.provider.balance(&self.identity.account_id).await?)
    }

    /// Next signer in round-robin order
    ///
    /// Concurrent callers may be handed the same key.
    pub fn next_signer(&self) -> Result<Signer> {
        let current = self.key_index.load(Ordering::Relaxed);
        let AgentSigner { signer, key_index } = get_agent_signer(&self.keys, current)?;
        self.key_index.store(key_index, Ordering::Relaxed);
        Ok(signer)
    }

    /// Attestation bound to the agent's primary public key, in contract form
    pub async fn attestation(&self) -> Result<ContractAttestation> {
        let report_data = self.identity.key.public_key().as_bytes();
        let evidence = collect_attestation(self.tee.as_deref(), report_data).await?;
        Ok(attestation_for_contract(&evidence))
    }

    /// Register the agent with the configured verifier contract
    pub async fn register(&self) -> Result<()> {
        let contract_id = self.config.agent_contract_id.as_ref().ok_or_else(|| {
            AgentError::Config("agent_contract_id is required to register".to_string())
        })?;
        let attestation = self.attestation().await?;
        let account = Account::new(
            self.identity.account_id.clone(),
            self.provider.clone(),
            self.identity.key.signer(),
        );
        register_agent(&account, contract_id, &attestation, &self.config.retry).await
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("account_id", &self.identity.account_id)
            .field("derived_with_tee", &self.identity.derived_with_tee)
            .field("keys", &self.keys.len())
            .finish_non_exhaustive()
    }
}
