//! Chain provider boundary
//!
//! The agent never talks RPC directly. Everything it needs from the chain goes
//! through [`ChainProvider`]: reading an account's access keys and balance, and
//! signing and broadcasting a transaction. The transport behind it (RPC client,
//! retrying HTTP layer, test double) is up to the caller.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shade_core::{AccountId, NearToken, PublicKey, Signer};
use thiserror::Error;

/// Gas attached to contract calls made by the agent (30 TGas)
pub const DEFAULT_FUNCTION_CALL_GAS: u64 = 30_000_000_000_000;

/// Errors raised by a chain provider before a transaction outcome is known
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Network or connection failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// RPC node rejected the request
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Anything else, carrying only a message
    #[error("{0}")]
    Other(String),
}

/// Permission attached to an added access key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessKeyPermission {
    FullAccess,
}

/// One action inside a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    AddKey {
        public_key: PublicKey,
        permission: AccessKeyPermission,
    },
    DeleteKey {
        public_key: PublicKey,
    },
    Transfer {
        deposit: NearToken,
    },
    FunctionCall {
        method_name: String,
        args: Vec<u8>,
        gas: u64,
        deposit: NearToken,
    },
}

/// Unsigned transaction handed to the provider together with a signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signer_id: AccountId,
    pub receiver_id: AccountId,
    pub actions: Vec<Action>,
}

/// Structured failure reported by the chain for an executed transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxFailure {
    #[serde(rename = "error_type", default)]
    pub kind: String,
    #[serde(rename = "error_message", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TxFailure {
    /// Human-readable reason: the message when present, else the kind
    pub fn reason(&self) -> &str {
        match self.message.as_deref() {
            Some(message) if !message.is_empty() => message,
            _ => &self.kind,
        }
    }
}

/// Final execution status of a transaction
///
/// Serializes to the chain's shape: `{"SuccessValue": ""}` or
/// `{"Failure": {"error_type": ..., "error_message": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    SuccessValue(String),
    Failure(TxFailure),
}

impl TxStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TxStatus::SuccessValue(_))
    }
}

/// Access to chain state and transaction broadcast
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Public keys currently authorized on `account_id`, in no guaranteed order
    async fn access_keys(&self, account_id: &AccountId) -> Result<Vec<PublicKey>, ProviderError>;

    /// Liquid balance of `account_id`
    async fn balance(&self, account_id: &AccountId) -> Result<NearToken, ProviderError>;

    /// Sign `transaction` with `signer`, broadcast it and wait for its final status
    async fn sign_and_send(
        &self,
        transaction: Transaction,
        signer: &Signer,
    ) -> Result<TxStatus, ProviderError>;
}

/// An account bound to a provider and the key that signs for it
#[derive(Clone)]
pub struct Account {
    id: AccountId,
    provider: Arc<dyn ChainProvider>,
    signer: Signer,
}

impl Account {
    pub fn new(id: AccountId, provider: Arc<dyn ChainProvider>, signer: Signer) -> Self {
        Self {
            id,
            provider,
            signer,
        }
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn provider(&self) -> &Arc<dyn ChainProvider> {
        &self.provider
    }

    pub async fn access_keys(&self) -> Result<Vec<PublicKey>, ProviderError> {
        self.provider.access_keys(&self.id).await
    }

    pub async fn balance(&self) -> Result<NearToken, ProviderError> {
        self.provider.balance(&self.id).await
    }

    /// Sign and send `actions` to `receiver_id` from this account
    pub async fn send(
        &self,
        receiver_id: &AccountId,
        actions: Vec<Action>,
    ) -> Result<TxStatus, ProviderError> {
        let transaction = Transaction {
            signer_id: self.id.clone(),
            receiver_id: receiver_id.clone(),
            actions,
        };
        self.provider.sign_and_send(transaction, &self.signer).await
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("signer", self.signer.public_key())
            .finish_non_exhaustive()
    }
}
