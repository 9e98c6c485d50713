//! TEE attestation canonicalization
//!
//! The TEE SDK hands out evidence with hex strings everywhere. The verifier
//! contract wants the quote as a byte array, the collateral's binary fields as
//! hex strings, and the TCB info as-is. This module converts between those
//! layouts and provides the zero-filled evidence used outside a TEE.
//!
//! Width rules:
//! - measurement registers (`mrtd`, `rtmr0`..`rtmr3`) are 48 bytes
//! - `compose_hash`, `device_id` and `os_image_hash` are 32 bytes
//!
//! A present field with the wrong width is rejected, never padded or truncated.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Width of a TDX measurement register in bytes
pub const MEASUREMENT_REGISTER_LEN: usize = 48;

/// Width of a hash or device identifier in bytes
pub const DIGEST_LEN: usize = 32;

/// Width of the zero-filled collateral signatures in the fallback evidence
pub const FALLBACK_SIGNATURE_LEN: usize = 32;

/// Collateral as returned by the collateral endpoint (binary fields hex-encoded)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCollateral {
    pub pck_crl_issuer_chain: Option<String>,
    pub root_ca_crl: Option<String>,
    pub pck_crl: Option<String>,
    pub tcb_info_issuer_chain: Option<String>,
    pub tcb_info: Option<String>,
    pub tcb_info_signature: Option<String>,
    pub qe_identity_issuer_chain: Option<String>,
    pub qe_identity: Option<String>,
    pub qe_identity_signature: Option<String>,
}

/// Quote collateral with binary fields decoded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collateral {
    pub pck_crl_issuer_chain: String,
    pub root_ca_crl: Vec<u8>,
    pub pck_crl: Vec<u8>,
    pub tcb_info_issuer_chain: String,
    pub tcb_info: String,
    pub tcb_info_signature: Vec<u8>,
    pub qe_identity_issuer_chain: String,
    pub qe_identity: String,
    pub qe_identity_signature: Vec<u8>,
}

/// One entry of the TEE runtime event log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    pub imr: u32,
    pub event_type: u32,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub event_payload: String,
}

/// TCB info in the TEE SDK's shape; every field may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTcbInfo {
    pub mrtd: Option<String>,
    pub rtmr0: Option<String>,
    pub rtmr1: Option<String>,
    pub rtmr2: Option<String>,
    pub rtmr3: Option<String>,
    pub os_image_hash: Option<String>,
    pub compose_hash: Option<String>,
    pub device_id: Option<String>,
    pub app_compose: Option<String>,
    pub event_log: Option<Vec<EventLog>>,
}

/// TCB info in the verifier contract's shape (hex strings)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcbInfo {
    pub mrtd: String,
    pub rtmr0: String,
    pub rtmr1: String,
    pub rtmr2: String,
    pub rtmr3: String,
    /// Optional; empty means absent
    pub os_image_hash: String,
    pub compose_hash: String,
    pub device_id: String,
    pub app_compose: String,
    pub event_log: Vec<EventLog>,
}

impl TcbInfo {
    /// Check that every present width-bound field is valid hex of its exact width
    pub fn validate(&self) -> Result<()> {
        let fields: [(&'static str, &str, usize); 8] = [
            ("mrtd", self.mrtd.as_str(), MEASUREMENT_REGISTER_LEN),
            ("rtmr0", self.rtmr0.as_str(), MEASUREMENT_REGISTER_LEN),
            ("rtmr1", self.rtmr1.as_str(), MEASUREMENT_REGISTER_LEN),
            ("rtmr2", self.rtmr2.as_str(), MEASUREMENT_REGISTER_LEN),
            ("rtmr3", self.rtmr3.as_str(), MEASUREMENT_REGISTER_LEN),
            ("os_image_hash", self.os_image_hash.as_str(), DIGEST_LEN),
            ("compose_hash", self.compose_hash.as_str(), DIGEST_LEN),
            ("device_id", self.device_id.as_str(), DIGEST_LEN),
        ];
        for (field, value, width) in fields {
            if value.is_empty() {
                continue;
            }
            let bytes = hex::decode(value).map_err(|e| Error::decoding(field, e))?;
            if bytes.len() != width {
                return Err(Error::decoding(
                    field,
                    format!("expected {} bytes, got {}", width, bytes.len()),
                ));
            }
        }
        Ok(())
    }
}

/// Full attestation evidence with binary fields decoded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationEvidence {
    pub quote: Vec<u8>,
    pub collateral: Collateral,
    pub tcb_info: TcbInfo,
}

/// Collateral as the verifier contract expects it (binary fields hex-encoded)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCollateral {
    pub pck_crl_issuer_chain: String,
    pub root_ca_crl: String,
    pub pck_crl: String,
    pub tcb_info_issuer_chain: String,
    pub tcb_info: String,
    pub tcb_info_signature: String,
    pub qe_identity_issuer_chain: String,
    pub qe_identity: String,
    pub qe_identity_signature: String,
}

/// Attestation in the verifier contract's wire form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAttestation {
    pub quote: Vec<u8>,
    pub collateral: ContractCollateral,
    pub tcb_info: TcbInfo,
}

fn decode_hex_field(field: &'static str, value: Option<&str>) -> Result<Vec<u8>> {
    match value {
        None | Some("") => Ok(Vec::new()),
        Some(hex_str) => hex::decode(hex_str).map_err(|e| Error::decoding(field, e)),
    }
}

/// Decode a quote hex string, with or without a `0x` prefix
pub fn transform_quote(quote_hex: &str) -> Result<Vec<u8>> {
    let cleaned = quote_hex.strip_prefix("0x").unwrap_or(quote_hex);
    hex::decode(cleaned).map_err(|e| Error::decoding("quote", e))
}

/// Decode the collateral's binary fields; missing fields become empty
pub fn transform_collateral(raw: &RawCollateral) -> Result<Collateral> {
    Ok(Collateral {
        pck_crl_issuer_chain: raw.pck_crl_issuer_chain.clone().unwrap_or_default(),
        root_ca_crl: decode_hex_field("root_ca_crl", raw.root_ca_crl.as_deref())?,
        pck_crl: decode_hex_field("pck_crl", raw.pck_crl.as_deref())?,
        tcb_info_issuer_chain: raw.tcb_info_issuer_chain.clone().unwrap_or_default(),
        tcb_info: raw.tcb_info.clone().unwrap_or_default(),
        tcb_info_signature: decode_hex_field(
            "tcb_info_signature",
            raw.tcb_info_signature.as_deref(),
        )?,
        qe_identity_issuer_chain: raw.qe_identity_issuer_chain.clone().unwrap_or_default(),
        qe_identity: raw.qe_identity.clone().unwrap_or_default(),
        qe_identity_signature: decode_hex_field(
            "qe_identity_signature",
            raw.qe_identity_signature.as_deref(),
        )?,
    })
}

/// Copy SDK TCB info into the contract shape, validating field widths
pub fn transform_tcb_info(raw: &RawTcbInfo) -> Result<TcbInfo> {
    let tcb_info = TcbInfo {
        mrtd: raw.mrtd.clone().unwrap_or_default(),
        rtmr0: raw.rtmr0.clone().unwrap_or_default(),
        rtmr1: raw.rtmr1.clone().unwrap_or_default(),
        rtmr2: raw.rtmr2.clone().unwrap_or_default(),
        rtmr3: raw.rtmr3.clone().unwrap_or_default(),
        os_image_hash: raw.os_image_hash.clone().unwrap_or_default(),
        compose_hash: raw.compose_hash.clone().unwrap_or_default(),
        device_id: raw.device_id.clone().unwrap_or_default(),
        app_compose: raw.app_compose.clone().unwrap_or_default(),
        event_log: raw.event_log.clone().unwrap_or_default(),
    };
    tcb_info.validate()?;
    Ok(tcb_info)
}

/// Re-encode collateral byte fields as hex for the verifier contract
pub fn attestation_for_contract(evidence: &AttestationEvidence) -> ContractAttestation {
    let collateral = &evidence.collateral;
    ContractAttestation {
        quote: evidence.quote.clone(),
        collateral: ContractCollateral {
            pck_crl_issuer_chain: collateral.pck_crl_issuer_chain.clone(),
            root_ca_crl: hex::encode(&collateral.root_ca_crl),
            pck_crl: hex::encode(&collateral.pck_crl),
            tcb_info_issuer_chain: collateral.tcb_info_issuer_chain.clone(),
            tcb_info: collateral.tcb_info.clone(),
            tcb_info_signature: hex::encode(&collateral.tcb_info_signature),
            qe_identity_issuer_chain: collateral.qe_identity_issuer_chain.clone(),
            qe_identity: collateral.qe_identity.clone(),
            qe_identity_signature: hex::encode(&collateral.qe_identity_signature),
        },
        tcb_info: evidence.tcb_info.clone(),
    }
}

/// Zero-filled evidence for agents running outside a TEE
///
/// A verifier that requires a TEE rejects this; one that does not accepts it.
pub fn fake_attestation() -> AttestationEvidence {
    let zero_register = "0".repeat(MEASUREMENT_REGISTER_LEN * 2);
    let zero_digest = "0".repeat(DIGEST_LEN * 2);

    AttestationEvidence {
        quote: Vec::new(),
        collateral: Collateral {
            tcb_info_signature: vec![0u8; FALLBACK_SIGNATURE_LEN],
            qe_identity_signature: vec![0u8; FALLBACK_SIGNATURE_LEN],
            ..Collateral::default()
        },
        tcb_info: TcbInfo {
            mrtd: zero_register.clone(),
            rtmr0: zero_register.clone(),
            rtmr1: zero_register.clone(),
            rtmr2: zero_register.clone(),
            rtmr3: zero_register,
            os_image_hash: String::new(),
            compose_hash: zero_digest.clone(),
            device_id: zero_digest,
            app_compose: String::new(),
            event_log: Vec::new(),
        },
    }
}
