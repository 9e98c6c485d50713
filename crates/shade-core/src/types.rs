//! Account identifiers and token amounts

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Length of an implicit account ID in hex characters (32-byte public key)
pub const IMPLICIT_ACCOUNT_LEN: usize = 64;

const MIN_ACCOUNT_LEN: usize = 2;
const MAX_ACCOUNT_LEN: usize = 64;

/// On-chain account identifier
///
/// Either a named account (`sponsor.testnet`) or an implicit account, which is
/// the lowercase hex encoding of an ed25519 public key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Parse and validate an account ID
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.len() < MIN_ACCOUNT_LEN || id.len() > MAX_ACCOUNT_LEN {
            return Err(Error::InvalidAccountId(format!(
                "{:?} must be {}-{} characters",
                id, MIN_ACCOUNT_LEN, MAX_ACCOUNT_LEN
            )));
        }
        let valid_chars = id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));
        if !valid_chars {
            return Err(Error::InvalidAccountId(format!(
                "{:?} contains characters outside [a-z0-9._-]",
                id
            )));
        }
        Ok(Self(id))
    }

    /// Implicit account ID controlled by an ed25519 public key
    pub fn implicit(public_key: &[u8; 32]) -> Self {
        Self(hex::encode(public_key))
    }

    /// Whether this is a 64-character hex implicit account
    pub fn is_implicit(&self) -> bool {
        self.0.len() == IMPLICIT_ACCOUNT_LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for AccountId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Token amount in yoctoNEAR (10^-24 NEAR)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NearToken(u128);

impl NearToken {
    /// Number of decimal places in one NEAR
    pub const DECIMALS: u32 = 24;

    /// One NEAR in yoctoNEAR
    pub const ONE_NEAR: u128 = 10u128.pow(Self::DECIMALS);

    pub const fn from_yocto(yocto: u128) -> Self {
        Self(yocto)
    }

    pub const fn as_yocto(&self) -> u128 {
        self.0
    }

    /// Whole NEAR amount
    pub fn from_near(near: u128) -> Result<Self> {
        near.checked_mul(Self::ONE_NEAR)
            .map(Self)
            .ok_or_else(|| Error::InvalidAmount(format!("{} NEAR overflows", near)))
    }

    /// Parse a decimal NEAR amount such as `"1.5"` exactly
    pub fn parse_near(s: &str) -> Result<Self> {
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(Error::InvalidAmount("empty amount".to_string()));
        }
        if frac.len() > Self::DECIMALS as usize {
            return Err(Error::InvalidAmount(format!(
                "{:?} has more than {} decimal places",
                s,
                Self::DECIMALS
            )));
        }
        if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAmount(format!("{:?} is not a decimal number", s)));
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|e| Error::InvalidAmount(format!("{:?}: {}", s, e)))?
        };
        let frac_yocto: u128 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = Self::DECIMALS as usize);
            padded
                .parse()
                .map_err(|e| Error::InvalidAmount(format!("{:?}: {}", s, e)))?
        };

        whole
            .checked_mul(Self::ONE_NEAR)
            .and_then(|w| w.checked_add(frac_yocto))
            .map(Self)
            .ok_or_else(|| Error::InvalidAmount(format!("{:?} overflows", s)))
    }
}

impl fmt::Display for NearToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::ONE_NEAR;
        let frac = self.0 % Self::ONE_NEAR;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let frac = format!("{:024}", frac);
        write!(f, "{}.{}", whole, frac.trim_end_matches('0'))
    }
}

impl FromStr for NearToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_near(s)
    }
}

impl Serialize for NearToken {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for NearToken {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse_near(&s).map_err(serde::de::Error::custom)
    }
}
