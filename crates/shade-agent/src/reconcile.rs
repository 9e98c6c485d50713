//! Key set reconciliation
//!
//! Brings the number of keys authorized on the agent account to the desired
//! count. Missing keys are derived and added in one transaction; surplus keys
//! are removed in one transaction, keeping the oldest held keys and the key
//! that signs the removal.

use std::collections::HashSet;

use rand::{CryptoRng, RngCore};
use shade_core::derivation::{derive_from_path, slot_path};
use shade_core::{KeyMaterial, PublicKey};
use tracing::{debug, info};

use crate::error::{AgentError, Result};
use crate::provider::Account;
use crate::submit::{add_keys_to_account, remove_keys_from_account, RetryPolicy};
use crate::tee::{generate_agent, TeeSource};

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    /// Locally held keys that are authorized after the pass
    pub keys_to_save: Vec<KeyMaterial>,
    /// Keys derived and added during the pass
    pub added: Vec<KeyMaterial>,
    /// True when `keys_to_save` is non-empty and every key came from the TEE
    pub all_derived_with_tee: bool,
}

impl ReconciliationResult {
    fn new(keys_to_save: Vec<KeyMaterial>, added: Vec<KeyMaterial>) -> Self {
        let all_derived_with_tee =
            !keys_to_save.is_empty() && keys_to_save.iter().all(|k| k.provenance().is_hardware());
        Self {
            keys_to_save,
            added,
            all_derived_with_tee,
        }
    }
}

/// Reconcile the account's authorized keys with `desired_count`
///
/// `held` are the keys this process holds secrets for. New keys come from the
/// TEE when one is given, otherwise from `"{path}-{slot}"` when a derivation
/// path is given, otherwise from `rng`.
pub async fn manage_key_setup<R>(
    account: &Account,
    held: &[KeyMaterial],
    desired_count: usize,
    tee: Option<&dyn TeeSource>,
    derivation_path: Option<&str>,
    rng: &mut R,
    policy: &RetryPolicy,
) -> Result<ReconciliationResult>
where
    R: RngCore + CryptoRng + Send,
{
    if desired_count == 0 {
        return Err(AgentError::InvalidKeyCount(desired_count));
    }

    let on_chain = account.access_keys().await?;
    let current = on_chain.len();
    debug!(
        "{} has {} key(s) authorized, {} desired",
        account.id(),
        current,
        desired_count
    );

    if current < desired_count {
        let retained = held_in(held, &on_chain);
        let mut added = Vec::with_capacity(desired_count - current);
        for slot in current..desired_count {
            let identity = match (tee, derivation_path) {
                (None, Some(path)) => derive_from_path(&slot_path(path, slot))?,
                _ => generate_agent(tee, None, rng).await?,
            };
            added.push(identity.key);
        }
        check_provenance(&retained, &added)?;

        info!("Adding {} key(s) to {}", added.len(), account.id());
        add_keys_to_account(account, &added, policy).await?;

        let mut keys_to_save = retained;
        keys_to_save.extend(added.iter().cloned());
        return Ok(ReconciliationResult::new(keys_to_save, added));
    }

    if current > desired_count {
        let surplus = select_surplus(
            &on_chain,
            held,
            account.signer().public_key(),
            current - desired_count,
        );
        let kept: Vec<PublicKey> = on_chain
            .iter()
            .filter(|k| !surplus.contains(*k))
            .cloned()
            .collect();
        let keys_to_save = require_held(held_in(held, &kept))?;

        info!("Removing {} key(s) from {}", surplus.len(), account.id());
        remove_keys_from_account(account, &surplus, policy).await?;
        return Ok(ReconciliationResult::new(keys_to_save, Vec::new()));
    }

    debug!("{} already has the desired key count", account.id());
    let keys_to_save = require_held(held_in(held, &on_chain))?;
    Ok(ReconciliationResult::new(keys_to_save, Vec::new()))
}

/// Pick `count` authorized keys to revoke
///
/// Keys this process holds no secret for go first, then held keys newest
/// first. The signing key is never picked.
fn select_surplus(
    on_chain: &[PublicKey],
    held: &[KeyMaterial],
    signer: &PublicKey,
    count: usize,
) -> Vec<PublicKey> {
    let held_keys: HashSet<&PublicKey> = held.iter().map(|k| k.public_key()).collect();
    let authorized: HashSet<&PublicKey> = on_chain.iter().collect();

    let unheld = on_chain.iter().rev().filter(|k| !held_keys.contains(*k));
    let newest_held = held
        .iter()
        .rev()
        .map(|k| k.public_key())
        .filter(|k| authorized.contains(*k));

    unheld
        .chain(newest_held)
        .filter(|k| *k != signer)
        .take(count)
        .cloned()
        .collect()
}

/// The agent must keep at least one key it can sign with
fn require_held(keys: Vec<KeyMaterial>) -> Result<Vec<KeyMaterial>> {
    if keys.is_empty() {
        return Err(AgentError::NoKeysAvailable);
    }
    Ok(keys)
}

/// Held keys whose public key appears in `authorized`, in held order
fn held_in(held: &[KeyMaterial], authorized: &[PublicKey]) -> Vec<KeyMaterial> {
    let authorized: HashSet<&PublicKey> = authorized.iter().collect();
    held.iter()
        .filter(|key| authorized.contains(key.public_key()))
        .cloned()
        .collect()
}

/// A key set is either entirely TEE-derived or entirely not
fn check_provenance(retained: &[KeyMaterial], added: &[KeyMaterial]) -> Result<()> {
    for new_key in added {
        let new_is_hardware = new_key.provenance().is_hardware();
        if let Some(existing) = retained
            .iter()
            .find(|k| k.provenance().is_hardware() != new_is_hardware)
        {
            let message = if existing.provenance().is_hardware() {
                "Existing keys were derived with TEE but additional keys were not"
            } else {
                "Additional keys were derived with TEE but existing keys were not"
            };
            return Err(AgentError::ProvenanceMismatch(message.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_core::Provenance;

    fn key(byte: u8, provenance: Provenance) -> KeyMaterial {
        KeyMaterial::from_ed25519_seed(&[byte; 32], provenance)
    }

    #[test]
    fn test_held_in_filters_and_keeps_order() {
        let a = key(1, Provenance::Random);
        let b = key(2, Provenance::Random);
        let c = key(3, Provenance::Random);
        let authorized = vec![c.public_key().clone(), a.public_key().clone()];

        let kept = held_in(&[a.clone(), b, c.clone()], &authorized);
        assert_eq!(kept, vec![a, c]);
    }

    #[test]
    fn test_select_surplus_prefers_unheld_then_newest_held() {
        let primary = key(1, Provenance::Random);
        let second = key(2, Provenance::Random);
        let third = key(3, Provenance::Random);
        let foreign = key(4, Provenance::Random);
        let on_chain = vec![
            third.public_key().clone(),
            primary.public_key().clone(),
            foreign.public_key().clone(),
            second.public_key().clone(),
        ];
        let held = [primary.clone(), second.clone(), third.clone()];

        let surplus = select_surplus(&on_chain, &held, primary.public_key(), 2);
        assert_eq!(
            surplus,
            vec![foreign.public_key().clone(), third.public_key().clone()]
        );
    }

    #[test]
    fn test_select_surplus_never_picks_signer() {
        let primary = key(1, Provenance::Random);
        let second = key(2, Provenance::Random);
        let on_chain = vec![second.public_key().clone(), primary.public_key().clone()];

        let held = [second.clone(), primary.clone()];

        let surplus = select_surplus(&on_chain, &held, primary.public_key(), 1);
        assert_eq!(surplus, vec![second.public_key().clone()]);
    }

    #[test]
    fn test_require_held_rejects_empty_set() {
        assert!(matches!(require_held(Vec::new()), Err(AgentError::NoKeysAvailable)));
        let keys = vec![key(1, Provenance::Random)];
        assert_eq!(require_held(keys.clone()).unwrap(), keys);
    }

    #[test]
    fn test_check_provenance_accepts_uniform_sets() {
        let hw = [key(1, Provenance::Hardware)];
        let sw = [key(2, Provenance::Path("p".into()))];
        check_provenance(&hw, &[key(3, Provenance::Hardware)]).unwrap();
        check_provenance(&sw, &[key(4, Provenance::Random)]).unwrap();
        check_provenance(&[], &[key(5, Provenance::Hardware)]).unwrap();
    }

    #[test]
    fn test_check_provenance_rejects_mixed_sets() {
        let hw = [key(1, Provenance::Hardware)];
        let err = check_provenance(&hw, &[key(2, Provenance::Random)]).unwrap_err();
        assert!(matches!(err, AgentError::ProvenanceMismatch(_)));

        let sw = [key(3, Provenance::Random)];
        let err = check_provenance(&sw, &[key(4, Provenance::Hardware)]).unwrap_err();
        assert!(matches!(err, AgentError::ProvenanceMismatch(_)));
    }

    #[test]
    fn test_all_derived_with_tee_requires_non_empty_hardware_set() {
        assert!(!ReconciliationResult::new(Vec::new(), Vec::new()).all_derived_with_tee);

        let hw = vec![key(1, Provenance::Hardware), key(2, Provenance::Hardware)];
        assert!(ReconciliationResult::new(hw, Vec::new()).all_derived_with_tee);

        let mixed = vec![key(1, Provenance::Hardware), key(2, Provenance::Random)];
        assert!(!ReconciliationResult::new(mixed, Vec::new()).all_derived_with_tee);
    }
}
