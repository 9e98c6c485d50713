//! Agent configuration

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shade_core::{AccountId, KeyMaterial, NearToken, Provenance};

use crate::error::{AgentError, Result};
use crate::provider::{Account, ChainProvider};
use crate::submit::RetryPolicy;

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "SHADE_AGENT_CONFIG";

/// Chain network the agent runs against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    /// Public RPC endpoint used when no override is configured
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Testnet => "https://test.rpc.fastnear.com",
            Network::Mainnet => "https://free.rpc.fastnear.com",
        }
    }
}

/// Retry settings for the RPC transport, separate from transaction retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcRetrySettings {
    pub retries: u32,
    pub backoff: u32,
    pub wait_ms: u64,
}

impl Default for RpcRetrySettings {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff: 2,
            wait_ms: 1000,
        }
    }
}

/// Account that pays for the agent account's initial balance
#[derive(Clone, Serialize, Deserialize)]
pub struct SponsorConfig {
    pub account_id: AccountId,
    pub private_key: String,
}

impl SponsorConfig {
    pub fn key(&self) -> Result<KeyMaterial> {
        Ok(KeyMaterial::from_secret_str(
            &self.private_key,
            Provenance::Random,
        )?)
    }
}

impl fmt::Debug for SponsorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SponsorConfig")
            .field("account_id", &self.account_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub network: Network,

    /// RPC endpoint override; the network default is used when unset
    pub rpc_url: Option<String>,

    pub rpc_retry: RpcRetrySettings,

    /// Verifier contract the agent registers with
    pub agent_contract_id: Option<AccountId>,

    pub sponsor: Option<SponsorConfig>,

    /// NEAR sent from the sponsor to a new agent account, as a decimal string
    pub fund_amount: String,

    /// Deterministic derivation path used when no TEE is available
    pub derivation_path: Option<String>,

    /// Total number of keys to keep authorized on the agent account
    pub num_keys: usize,

    /// Transaction retry policy
    pub retry: RetryPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            rpc_url: None,
            rpc_retry: RpcRetrySettings::default(),
            agent_contract_id: None,
            sponsor: None,
            fund_amount: "0.3".to_string(),
            derivation_path: None,
            num_keys: 1,
            retry: RetryPolicy::default(),
        }
    }
}

impl AgentConfig {
    /// Config file location: `SHADE_AGENT_CONFIG`, else the user config dir
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("shade")
                    .join("agent.json")
            })
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_keys == 0 {
            return Err(AgentError::Config("num_keys must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(AgentError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        self.fund_amount()?;
        if let Some(sponsor) = &self.sponsor {
            sponsor.key()?;
        }
        Ok(())
    }

    pub fn rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_rpc_url())
    }

    pub fn fund_amount(&self) -> Result<NearToken> {
        NearToken::parse_near(&self.fund_amount)
            .map_err(|e| AgentError::Config(format!("fund_amount: {}", e)))
    }

    /// Sponsor account bound to `provider`, if one is configured
    pub fn sponsor_account(&self, provider: Arc<dyn ChainProvider>) -> Result<Option<Account>> {
        match &self.sponsor {
            Some(sponsor) => Ok(Some(Account::new(
                sponsor.account_id.clone(),
                provider,
                sponsor.key()?.signer(),
            ))),
            None => Ok(None),
        }
    }

    /// Copy safe to print: the sponsor key is blanked
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if let Some(sponsor) = config.sponsor.as_mut() {
            sponsor.private_key = "<redacted>".to_string();
        }
        config
    }
}
