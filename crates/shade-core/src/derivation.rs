//! Seed derivation for agent keys
//!
//! A key is derived from one of three inputs:
//! - TEE-rooted key material mixed with a fresh nonce (never reproducible)
//! - a derivation path string (fully deterministic)
//! - nothing, in which case the seed is drawn from the random source
//!
//! The random source is always passed in, so tests can drive it with a seeded RNG.

use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::Result;
use crate::keys::{KeyMaterial, Provenance};
use crate::types::AccountId;

/// Agent account plus the key that controls it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    pub account_id: AccountId,
    pub key: KeyMaterial,
    pub derived_with_tee: bool,
}

impl AgentIdentity {
    /// Wrap an ed25519 key as an implicit-account identity
    pub fn from_key(key: KeyMaterial) -> Result<Self> {
        Ok(Self {
            account_id: key.implicit_account_id()?,
            derived_with_tee: key.provenance().is_hardware(),
            key,
        })
    }
}

/// Seed from a derivation path: SHA256 of the path bytes
pub fn seed_from_path(path: &str) -> Zeroizing<[u8; 32]> {
    Zeroizing::new(Sha256::digest(path.as_bytes()).into())
}

/// Seed from TEE key material: SHA256(hardware_key || nonce)
pub fn seed_from_hardware(hardware_key: &[u8], nonce: &[u8; 32]) -> Zeroizing<[u8; 32]> {
    let mut hasher = Sha256::new();
    hasher.update(hardware_key);
    hasher.update(nonce);
    Zeroizing::new(hasher.finalize().into())
}

/// 32 bytes straight from the random source
pub fn random_seed<R: RngCore + CryptoRng>(rng: &mut R) -> Zeroizing<[u8; 32]> {
    let mut seed = Zeroizing::new([0u8; 32]);
    rng.fill_bytes(&mut seed[..]);
    seed
}

/// Path used for the key occupying `slot` in a path-derived key set
///
/// Slot 0 is the primary key and uses the path itself; every later slot
/// appends `-{slot}`, so the same path always reproduces the same set.
pub fn slot_path(path: &str, slot: usize) -> String {
    if slot == 0 {
        path.to_string()
    } else {
        format!("{}-{}", path, slot)
    }
}

/// Identity for a derivation path
pub fn derive_from_path(path: &str) -> Result<AgentIdentity> {
    let seed = seed_from_path(path);
    AgentIdentity::from_key(KeyMaterial::from_ed25519_seed(
        &seed,
        Provenance::Path(path.to_string()),
    ))
}

/// Identity seeded from TEE key material plus a nonce drawn from `rng`
pub fn derive_from_hardware<R: RngCore + CryptoRng>(
    hardware_key: &[u8],
    rng: &mut R,
) -> Result<AgentIdentity> {
    let mut nonce = Zeroizing::new([0u8; 32]);
    rng.fill_bytes(&mut nonce[..]);
    let seed = seed_from_hardware(hardware_key, &nonce);
    AgentIdentity::from_key(KeyMaterial::from_ed25519_seed(&seed, Provenance::Hardware))
}

/// Identity seeded entirely from `rng`
pub fn derive_random<R: RngCore + CryptoRng>(rng: &mut R) -> Result<AgentIdentity> {
    let seed = random_seed(rng);
    AgentIdentity::from_key(KeyMaterial::from_ed25519_seed(&seed, Provenance::Random))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_path_derivation_is_deterministic() {
        let a = derive_from_path("deterministic-path").unwrap();
        let b = derive_from_path("deterministic-path").unwrap();
        assert_eq!(a, b);
        assert!(!a.derived_with_tee);
        assert_eq!(a.key.provenance(), &Provenance::Path("deterministic-path".into()));
    }

    #[test]
    fn test_different_paths_differ() {
        assert_ne!(
            derive_from_path("path1").unwrap().account_id,
            derive_from_path("path2").unwrap().account_id
        );
    }

    #[test]
    fn test_account_id_format() {
        let identity = derive_from_path("test-derivation-path").unwrap();
        let id = identity.account_id.as_str();
        assert_eq!(id.len(), 64);
        assert!(id.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
        assert!(identity.key.secret_key_string().starts_with("ed25519:"));
    }

    #[test]
    fn test_hardware_derivation_mixes_fresh_nonce() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let hardware_key = [1u8; 32];

        let a = derive_from_hardware(&hardware_key, &mut rng).unwrap();
        let b = derive_from_hardware(&hardware_key, &mut rng).unwrap();

        assert!(a.derived_with_tee);
        assert!(b.derived_with_tee);
        assert_ne!(a.key, b.key);
        assert_ne!(a.account_id, b.account_id);
    }

    #[test]
    fn test_hardware_derivation_reproducible_with_same_rng_state() {
        let hardware_key = [9u8; 32];
        let a = derive_from_hardware(&hardware_key, &mut ChaCha20Rng::seed_from_u64(1)).unwrap();
        let b = derive_from_hardware(&hardware_key, &mut ChaCha20Rng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_derivation_differs_per_call() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let a = derive_random(&mut rng).unwrap();
        let b = derive_random(&mut rng).unwrap();
        assert_ne!(a.account_id, b.account_id);
        assert!(!a.derived_with_tee);
    }

    #[test]
    fn test_slot_path() {
        assert_eq!(slot_path("hi", 0), "hi");
        assert_eq!(slot_path("hi", 1), "hi-1");
        assert_eq!(slot_path("hi", 12), "hi-12");
    }
}
