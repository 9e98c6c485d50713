//! Round-robin signer selection over a fixed key list

use crate::error::{Error, Result};
use crate::keys::{KeyMaterial, Signer};

/// Signer picked for the current call plus the index to pass next time
#[derive(Debug, Clone)]
pub struct AgentSigner {
    pub signer: Signer,
    pub key_index: usize,
}

/// Select the signer at `current_index` and return the following index
///
/// The caller owns the index between calls. An index past the end wraps
/// around instead of failing.
pub fn get_agent_signer(keys: &[KeyMaterial], current_index: usize) -> Result<AgentSigner> {
    if keys.is_empty() {
        return Err(Error::NoKeysAvailable);
    }
    let index = current_index % keys.len();
    Ok(AgentSigner {
        signer: keys[index].signer(),
        key_index: (index + 1) % keys.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Provenance;

    fn keys(n: u8) -> Vec<KeyMaterial> {
        (0..n)
            .map(|i| KeyMaterial::from_ed25519_seed(&[i + 1; 32], Provenance::Random))
            .collect()
    }

    #[test]
    fn test_empty_keys_rejected() {
        let err = get_agent_signer(&[], 0).unwrap_err();
        assert!(matches!(err, Error::NoKeysAvailable));
        assert_eq!(err.to_string(), "No agent keys available");
    }

    #[test]
    fn test_single_key_self_loop() {
        let keys = keys(1);
        let first = get_agent_signer(&keys, 0).unwrap();
        let second = get_agent_signer(&keys, first.key_index).unwrap();
        assert_eq!(first.key_index, 0);
        assert_eq!(second.key_index, 0);
        assert_eq!(first.signer.public_key(), keys[0].public_key());
    }

    #[test]
    fn test_rotation_wraps_around() {
        let keys = keys(3);

        let r1 = get_agent_signer(&keys, 0).unwrap();
        assert_eq!(r1.key_index, 1);
        assert_eq!(r1.signer.public_key(), keys[0].public_key());

        let r2 = get_agent_signer(&keys, r1.key_index).unwrap();
        assert_eq!(r2.key_index, 2);
        assert_eq!(r2.signer.public_key(), keys[1].public_key());

        let r3 = get_agent_signer(&keys, r2.key_index).unwrap();
        assert_eq!(r3.key_index, 0);
        assert_eq!(r3.signer.public_key(), keys[2].public_key());
    }

    #[test]
    fn test_out_of_range_index_wraps() {
        let keys = keys(3);
        let result = get_agent_signer(&keys, 4).unwrap();
        assert_eq!(result.signer.public_key(), keys[1].public_key());
        assert_eq!(result.key_index, 2);
    }
}
