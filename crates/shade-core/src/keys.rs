//! Agent key material, key string encodings and transaction signers
//!
//! Keys use the chain's string encoding: an algorithm prefix followed by the
//! base58 encoding of the raw key bytes, e.g. `ed25519:3D4Y...`.

use core::fmt;
use core::str::FromStr;

use ed25519_dalek::Signer as _;
use k256::ecdsa::signature::Verifier as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::types::AccountId;

/// Raw length of an ed25519 seed
pub const ED25519_SEED_LEN: usize = 32;
/// Raw length of an ed25519 secret key string payload (seed || public key)
pub const ED25519_KEYPAIR_LEN: usize = 64;
/// Raw length of an ed25519 public key
pub const ED25519_PUBLIC_LEN: usize = 32;
/// Raw length of a secp256k1 secret scalar
pub const SECP256K1_SECRET_LEN: usize = 32;
/// Raw length of a secp256k1 public key (uncompressed point without the 0x04 tag)
pub const SECP256K1_PUBLIC_LEN: usize = 64;

/// Signature algorithm of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Ed25519,
    Secp256k1,
}

impl KeyAlgorithm {
    /// String prefix used in key encodings
    pub fn prefix(&self) -> &'static str {
        match self {
            KeyAlgorithm::Ed25519 => "ed25519",
            KeyAlgorithm::Secp256k1 => "secp256k1",
        }
    }

    fn split_encoded(s: &str) -> Result<(Self, &str)> {
        match s.split_once(':') {
            Some(("ed25519", data)) => Ok((KeyAlgorithm::Ed25519, data)),
            Some(("secp256k1", data)) => Ok((KeyAlgorithm::Secp256k1, data)),
            Some((other, _)) => Err(Error::InvalidKey(format!(
                "unknown key algorithm {:?}",
                other
            ))),
            None => Err(Error::InvalidKey(
                "missing 'ed25519:' or 'secp256k1:' prefix".to_string(),
            )),
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// How a key was produced
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// Seeded from TEE-rooted key material mixed with fresh randomness
    Hardware,
    /// Seeded deterministically from a derivation path string
    Path(String),
    /// Seeded from the random source
    Random,
}

impl Provenance {
    pub fn is_hardware(&self) -> bool {
        matches!(self, Provenance::Hardware)
    }
}

/// Public key in chain encoding
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    algorithm: KeyAlgorithm,
    data: Vec<u8>,
}

impl PublicKey {
    /// Create from raw bytes, checking the length for the algorithm
    pub fn from_bytes(algorithm: KeyAlgorithm, data: &[u8]) -> Result<Self> {
        let expected = match algorithm {
            KeyAlgorithm::Ed25519 => ED25519_PUBLIC_LEN,
            KeyAlgorithm::Secp256k1 => SECP256K1_PUBLIC_LEN,
        };
        if data.len() != expected {
            return Err(Error::InvalidKey(format!(
                "{} public key must be {} bytes, got {}",
                algorithm,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            algorithm,
            data: data.to_vec(),
        })
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Verify a signature produced by [`Signer::sign`]
    pub fn verify(&self, message: &[u8], signature: &KeySignature) -> Result<()> {
        if signature.algorithm != self.algorithm {
            return Err(Error::Signing(format!(
                "{} signature checked against {} key",
                signature.algorithm, self.algorithm
            )));
        }
        match self.algorithm {
            KeyAlgorithm::Ed25519 => {
                let bytes: [u8; ED25519_PUBLIC_LEN] = self.data[..]
                    .try_into()
                    .map_err(|_| Error::InvalidKey("bad ed25519 public key length".to_string()))?;
                let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
                    .map_err(|e| Error::InvalidKey(e.to_string()))?;
                let sig = ed25519_dalek::Signature::from_slice(&signature.bytes)
                    .map_err(|e| Error::Signing(e.to_string()))?;
                verifying_key
                    .verify_strict(message, &sig)
                    .map_err(|e| Error::Signing(e.to_string()))
            }
            KeyAlgorithm::Secp256k1 => {
                let mut sec1 = Vec::with_capacity(SECP256K1_PUBLIC_LEN + 1);
                sec1.push(0x04);
                sec1.extend_from_slice(&self.data);
                let verifying_key = k256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|e| Error::InvalidKey(format!("Invalid public key: {}", e)))?;
                if signature.bytes.len() < 64 {
                    return Err(Error::Signing("secp256k1 signature too short".to_string()));
                }
                let sig = k256::ecdsa::Signature::from_slice(&signature.bytes[..64])
                    .map_err(|e| Error::Signing(format!("Invalid signature format: {}", e)))?;
                verifying_key
                    .verify(message, &sig)
                    .map_err(|e| Error::Signing(e.to_string()))
            }
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, bs58::encode(&self.data).into_string())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl FromStr for PublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (algorithm, data) = KeyAlgorithm::split_encoded(s)?;
        let bytes = bs58::decode(data)
            .into_vec()
            .map_err(|e| Error::InvalidKey(format!("bad base58 public key: {}", e)))?;
        Self::from_bytes(algorithm, &bytes)
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A signing keypair together with how it was produced
///
/// Secret bytes are wiped on drop and never appear in `Debug` output.
#[derive(Clone)]
pub struct KeyMaterial {
    algorithm: KeyAlgorithm,
    secret: Zeroizing<Vec<u8>>,
    public_key: PublicKey,
    provenance: Provenance,
}

impl KeyMaterial {
    /// Build an ed25519 keypair from a 32-byte seed
    pub fn from_ed25519_seed(seed: &[u8; ED25519_SEED_LEN], provenance: Provenance) -> Self {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(seed);
        let public_key = PublicKey {
            algorithm: KeyAlgorithm::Ed25519,
            data: signing_key.verifying_key().to_bytes().to_vec(),
        };
        Self {
            algorithm: KeyAlgorithm::Ed25519,
            secret: Zeroizing::new(signing_key.to_keypair_bytes().to_vec()),
            public_key,
            provenance,
        }
    }

    /// Parse a secret key string (`ed25519:...` or `secp256k1:...`)
    ///
    /// Provenance is not part of the encoding, so the caller supplies it.
    pub fn from_secret_str(s: &str, provenance: Provenance) -> Result<Self> {
        let (algorithm, data) = KeyAlgorithm::split_encoded(s.trim())?;
        let bytes = Zeroizing::new(
            bs58::decode(data)
                .into_vec()
                .map_err(|e| Error::InvalidKey(format!("bad base58 secret key: {}", e)))?,
        );

        match algorithm {
            KeyAlgorithm::Ed25519 => {
                let keypair: &[u8; ED25519_KEYPAIR_LEN] = bytes[..].try_into().map_err(|_| {
                    Error::InvalidKey(format!(
                        "ed25519 secret key must be {} bytes, got {}",
                        ED25519_KEYPAIR_LEN,
                        bytes.len()
                    ))
                })?;
                let signing_key = ed25519_dalek::SigningKey::from_keypair_bytes(keypair)
                    .map_err(|e| Error::InvalidKey(format!("inconsistent ed25519 keypair: {}", e)))?;
                let public_key = PublicKey {
                    algorithm,
                    data: signing_key.verifying_key().to_bytes().to_vec(),
                };
                Ok(Self {
                    algorithm,
                    secret: bytes,
                    public_key,
                    provenance,
                })
            }
            KeyAlgorithm::Secp256k1 => {
                if bytes.len() != SECP256K1_SECRET_LEN {
                    return Err(Error::InvalidKey(format!(
                        "secp256k1 secret key must be {} bytes, got {}",
                        SECP256K1_SECRET_LEN,
                        bytes.len()
                    )));
                }
                let signing_key = k256::ecdsa::SigningKey::from_slice(&bytes)
                    .map_err(|e| Error::InvalidKey(format!("Invalid secret key: {}", e)))?;
                let encoded = signing_key.verifying_key().to_encoded_point(false);
                let public_key = PublicKey::from_bytes(algorithm, &encoded.as_bytes()[1..])?;
                Ok(Self {
                    algorithm,
                    secret: bytes,
                    public_key,
                    provenance,
                })
            }
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Secret key in chain string encoding
    pub fn secret_key_string(&self) -> Zeroizing<String> {
        Zeroizing::new(format!(
            "{}:{}",
            self.algorithm,
            bs58::encode(&self.secret[..]).into_string()
        ))
    }

    /// Implicit account controlled by this key (ed25519 only)
    pub fn implicit_account_id(&self) -> Result<AccountId> {
        match self.algorithm {
            KeyAlgorithm::Ed25519 => {
                let bytes: &[u8; ED25519_PUBLIC_LEN] =
                    self.public_key.as_bytes().try_into().map_err(|_| {
                        Error::InvalidKey("bad ed25519 public key length".to_string())
                    })?;
                Ok(AccountId::implicit(bytes))
            }
            KeyAlgorithm::Secp256k1 => Err(Error::InvalidKey(
                "implicit accounts require an ed25519 key".to_string(),
            )),
        }
    }

    /// Signer backed by this key
    pub fn signer(&self) -> Signer {
        Signer { key: self.clone() }
    }
}

impl PartialEq for KeyMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm
            && self.secret[..] == other.secret[..]
            && self.provenance == other.provenance
    }
}

impl Eq for KeyMaterial {}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("public_key", &self.public_key)
            .field("provenance", &self.provenance)
            .finish_non_exhaustive()
    }
}

/// Signature over a message, tagged with its algorithm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySignature {
    pub algorithm: KeyAlgorithm,
    /// 64 bytes for ed25519, 65 bytes (r || s || recovery id) for secp256k1
    pub bytes: Vec<u8>,
}

impl fmt::Display for KeySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, bs58::encode(&self.bytes).into_string())
    }
}

/// Transaction signer handed to the chain provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signer {
    key: KeyMaterial,
}

impl Signer {
    pub fn public_key(&self) -> &PublicKey {
        self.key.public_key()
    }

    pub fn key(&self) -> &KeyMaterial {
        &self.key
    }

    /// Sign a message with the underlying key
    pub fn sign(&self, message: &[u8]) -> Result<KeySignature> {
        match self.key.algorithm {
            KeyAlgorithm::Ed25519 => {
                let keypair: &[u8; ED25519_KEYPAIR_LEN] = self.key.secret[..]
                    .try_into()
                    .map_err(|_| Error::Signing("bad ed25519 keypair length".to_string()))?;
                let signing_key = ed25519_dalek::SigningKey::from_keypair_bytes(keypair)
                    .map_err(|e| Error::Signing(e.to_string()))?;
                Ok(KeySignature {
                    algorithm: KeyAlgorithm::Ed25519,
                    bytes: signing_key.sign(message).to_bytes().to_vec(),
                })
            }
            KeyAlgorithm::Secp256k1 => {
                let signing_key = k256::ecdsa::SigningKey::from_slice(&self.key.secret)
                    .map_err(|e| Error::Signing(e.to_string()))?;
                let (sig, recovery_id) = signing_key
                    .sign_recoverable(message)
                    .map_err(|e| Error::Signing(e.to_string()))?;
                let mut bytes = sig.to_bytes().to_vec();
                bytes.push(recovery_id.to_byte());
                Ok(KeySignature {
                    algorithm: KeyAlgorithm::Secp256k1,
                    bytes,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ed25519_key(byte: u8) -> KeyMaterial {
        KeyMaterial::from_ed25519_seed(&[byte; 32], Provenance::Random)
    }

    #[test]
    fn test_secret_key_string_roundtrip() {
        let key = ed25519_key(0x11);
        let encoded = key.secret_key_string();
        assert!(encoded.starts_with("ed25519:"));

        let parsed = KeyMaterial::from_secret_str(&encoded, Provenance::Random).unwrap();
        assert_eq!(parsed, key);
        assert_eq!(parsed.public_key(), key.public_key());
    }

    #[test]
    fn test_public_key_string_roundtrip() {
        let key = ed25519_key(0x22);
        let encoded = key.public_key().to_string();
        let parsed: PublicKey = encoded.parse().unwrap();
        assert_eq!(&parsed, key.public_key());
    }

    #[test]
    fn test_secp256k1_secret_key() {
        let encoded = format!("secp256k1:{}", bs58::encode([0x42u8; 32]).into_string());
        let key = KeyMaterial::from_secret_str(&encoded, Provenance::Random).unwrap();
        assert_eq!(key.algorithm(), KeyAlgorithm::Secp256k1);
        assert_eq!(key.public_key().as_bytes().len(), SECP256K1_PUBLIC_LEN);
        assert_eq!(*key.secret_key_string(), encoded);
        assert!(key.implicit_account_id().is_err());
    }

    #[test]
    fn test_rejects_malformed_secret_keys() {
        assert!(KeyMaterial::from_secret_str("nope", Provenance::Random).is_err());
        assert!(KeyMaterial::from_secret_str("rsa:abc", Provenance::Random).is_err());
        assert!(KeyMaterial::from_secret_str("ed25519:0OIl", Provenance::Random).is_err());

        let short = format!("ed25519:{}", bs58::encode([1u8; 32]).into_string());
        assert!(KeyMaterial::from_secret_str(&short, Provenance::Random).is_err());
    }

    #[test]
    fn test_rejects_inconsistent_ed25519_keypair() {
        let mut bytes = ed25519_key(0x33).secret.to_vec();
        bytes[40] ^= 0xff;
        let encoded = format!("ed25519:{}", bs58::encode(&bytes).into_string());
        assert!(KeyMaterial::from_secret_str(&encoded, Provenance::Random).is_err());
    }

    #[test]
    fn test_ed25519_sign_and_verify() {
        let key = ed25519_key(0x44);
        let signature = key.signer().sign(b"payload").unwrap();
        assert_eq!(signature.bytes.len(), 64);
        key.public_key().verify(b"payload", &signature).unwrap();
        assert!(key.public_key().verify(b"other", &signature).is_err());
    }

    #[test]
    fn test_secp256k1_sign_and_verify() {
        let encoded = format!("secp256k1:{}", bs58::encode([0x07u8; 32]).into_string());
        let key = KeyMaterial::from_secret_str(&encoded, Provenance::Random).unwrap();
        let signature = key.signer().sign(b"payload").unwrap();
        assert_eq!(signature.bytes.len(), 65);
        key.public_key().verify(b"payload", &signature).unwrap();
    }

    #[test]
    fn test_debug_redacts_secret() {
        let key = ed25519_key(0x55);
        let debug = format!("{:?}", key);
        let secret = key.secret_key_string();
        assert!(!debug.contains(secret.trim_start_matches("ed25519:")));
    }

    #[test]
    fn test_implicit_account_matches_public_key_hex() {
        let key = ed25519_key(0x66);
        let account = key.implicit_account_id().unwrap();
        assert!(account.is_implicit());
        assert_eq!(account.as_str(), hex::encode(key.public_key().as_bytes()));
    }
}
