//! Transaction submission with bounded retries
//!
//! Every state-changing call the agent makes goes through [`submit_with_retry`]:
//! build the actions once, send them up to `max_attempts` times, and map the
//! last failure to an error message that names the operation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shade_core::{AccountId, ContractAttestation, KeyMaterial, NearToken, PublicKey};
use tracing::{info, warn};

use crate::error::{AgentError, Result};
use crate::provider::{
    AccessKeyPermission, Account, Action, TxFailure, TxStatus, DEFAULT_FUNCTION_CALL_GAS,
};

/// How many times to send a transaction and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds
    #[serde(default)]
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 0,
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Operation being submitted; selects the error messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitKind {
    AddKeys,
    RemoveKeys,
    Fund { agent_id: AccountId },
    RegisterAgent { agent_id: AccountId },
}

impl SubmitKind {
    fn operation(&self) -> &'static str {
        match self {
            SubmitKind::AddKeys => "Add keys",
            SubmitKind::RemoveKeys => "Remove keys",
            SubmitKind::Fund { .. } => "Transfer",
            SubmitKind::RegisterAgent { .. } => "Register agent",
        }
    }

    /// Message used when the last attempt produced a chain failure
    fn failed_message(&self, failure: &TxFailure) -> String {
        format!("{} transaction failed: {}", self.operation(), failure.reason())
    }

    /// Message used when the last attempt never got a chain outcome
    fn unreachable_message(&self) -> String {
        match self {
            SubmitKind::AddKeys => "Failed to add keys".to_string(),
            SubmitKind::RemoveKeys => "Failed to remove keys".to_string(),
            SubmitKind::Fund { agent_id } => format!("Failed to fund agent account {}", agent_id),
            SubmitKind::RegisterAgent { agent_id } => {
                format!("Failed to register agent {}", agent_id)
            }
        }
    }
}

/// Send `actions` from `account` to `receiver_id` until one attempt succeeds
///
/// Provider errors and chain failures are retried alike. The returned error
/// carries the last chain failure when there was one.
pub async fn submit_with_retry(
    account: &Account,
    receiver_id: &AccountId,
    actions: Vec<Action>,
    kind: SubmitKind,
    policy: &RetryPolicy,
) -> Result<()> {
    let attempts = policy.max_attempts.max(1);
    let mut last_failure: Option<TxFailure> = None;

    for attempt in 1..=attempts {
        match account.send(receiver_id, actions.clone()).await {
            Ok(TxStatus::SuccessValue(_)) => {
                info!(
                    "{} transaction from {} succeeded on attempt {}",
                    kind.operation(),
                    account.id(),
                    attempt
                );
                return Ok(());
            }
            Ok(TxStatus::Failure(failure)) => {
                warn!(
                    "{} transaction attempt {}/{} failed: {}",
                    kind.operation(),
                    attempt,
                    attempts,
                    failure.reason()
                );
                last_failure = Some(failure);
            }
            Err(e) => {
                warn!(
                    "{} transaction attempt {}/{} errored: {}",
                    kind.operation(),
                    attempt,
                    attempts,
                    e
                );
                last_failure = None;
            }
        }

        if attempt < attempts && policy.delay_ms > 0 {
            tokio::time::sleep(policy.delay()).await;
        }
    }

    let message = match &last_failure {
        Some(failure) => kind.failed_message(failure),
        None => kind.unreachable_message(),
    };
    Err(AgentError::Submission {
        message,
        failure: last_failure,
    })
}

/// Authorize `keys` on the account with full access, in one transaction
pub async fn add_keys_to_account(
    account: &Account,
    keys: &[KeyMaterial],
    policy: &RetryPolicy,
) -> Result<()> {
    if keys.is_empty() {
        return Ok(());
    }
    let actions = keys
        .iter()
        .map(|key| Action::AddKey {
            public_key: key.public_key().clone(),
            permission: AccessKeyPermission::FullAccess,
        })
        .collect();
    info!("Adding {} key(s) to {}", keys.len(), account.id());
    submit_with_retry(account, account.id(), actions, SubmitKind::AddKeys, policy).await
}

/// Revoke `public_keys` from the account, in one transaction
pub async fn remove_keys_from_account(
    account: &Account,
    public_keys: &[PublicKey],
    policy: &RetryPolicy,
) -> Result<()> {
    if public_keys.is_empty() {
        return Ok(());
    }
    let actions = public_keys
        .iter()
        .map(|public_key| Action::DeleteKey {
            public_key: public_key.clone(),
        })
        .collect();
    info!("Removing {} key(s) from {}", public_keys.len(), account.id());
    submit_with_retry(account, account.id(), actions, SubmitKind::RemoveKeys, policy).await
}

/// Transfer `amount` from the sponsor account to the agent
pub async fn internal_fund_agent(
    sponsor: &Account,
    agent_id: &AccountId,
    amount: NearToken,
    policy: &RetryPolicy,
) -> Result<()> {
    info!("Funding agent {} with {} NEAR from {}", agent_id, amount, sponsor.id());
    submit_with_retry(
        sponsor,
        agent_id,
        vec![Action::Transfer { deposit: amount }],
        SubmitKind::Fund {
            agent_id: agent_id.clone(),
        },
        policy,
    )
    .await
}

/// Call `register_agent` on the verifier contract with the agent's attestation
pub async fn register_agent(
    agent: &Account,
    contract_id: &AccountId,
    attestation: &ContractAttestation,
    policy: &RetryPolicy,
) -> Result<()> {
    let args = serde_json::to_vec(&serde_json::json!({ "attestation": attestation }))?;
    info!("Registering agent {} with {}", agent.id(), contract_id);
    submit_with_retry(
        agent,
        contract_id,
        vec![Action::FunctionCall {
            method_name: "register_agent".to_string(),
            args,
            gas: DEFAULT_FUNCTION_CALL_GAS,
            deposit: NearToken::default(),
        }],
        SubmitKind::RegisterAgent {
            agent_id: agent.id().clone(),
        },
        policy,
    )
    .await
}
