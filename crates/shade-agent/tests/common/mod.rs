//! Shared test doubles for the chain provider and the TEE

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use shade_agent::{
    Action, AgentError, ChainProvider, ProviderError, TeeSource, Transaction, TxFailure, TxStatus,
};
use shade_core::{
    AccountId, KeyAlgorithm, KeyMaterial, NearToken, Provenance, PublicKey, RawCollateral,
    RawTcbInfo, Signer,
};

/// In-memory chain: per-account key lists, scripted send results, call counters
///
/// Sends without a scripted result succeed. Successful sends apply their
/// actions, and a transfer to an unknown implicit account creates it with the
/// key its ID encodes.
#[derive(Default)]
pub struct MockProvider {
    pub keys: Mutex<HashMap<AccountId, Vec<PublicKey>>>,
    pub balances: Mutex<HashMap<AccountId, NearToken>>,
    pub scripted: Mutex<VecDeque<Result<TxStatus, ProviderError>>>,
    pub sent: Mutex<Vec<Transaction>>,
    pub access_key_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(account_id: &AccountId, keys: &[KeyMaterial]) -> Self {
        let provider = Self::new();
        provider.set_keys(account_id, keys);
        provider
    }

    pub fn set_keys(&self, account_id: &AccountId, keys: &[KeyMaterial]) {
        self.keys.lock().unwrap().insert(
            account_id.clone(),
            keys.iter().map(|k| k.public_key().clone()).collect(),
        );
    }

    pub fn keys_of(&self, account_id: &AccountId) -> Vec<PublicKey> {
        self.keys
            .lock()
            .unwrap()
            .get(account_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn script(&self, result: Result<TxStatus, ProviderError>) {
        self.scripted.lock().unwrap().push_back(result);
    }

    pub fn script_failure(&self, kind: &str, message: Option<&str>) {
        self.script(Ok(TxStatus::Failure(TxFailure {
            kind: kind.to_string(),
            message: message.map(str::to_string),
        })));
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn access_key_calls(&self) -> usize {
        self.access_key_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    fn apply(&self, transaction: &Transaction) {
        let mut keys = self.keys.lock().unwrap();
        for action in &transaction.actions {
            match action {
                Action::AddKey { public_key, .. } => keys
                    .entry(transaction.receiver_id.clone())
                    .or_default()
                    .push(public_key.clone()),
                Action::DeleteKey { public_key } => {
                    if let Some(list) = keys.get_mut(&transaction.receiver_id) {
                        list.retain(|k| k != public_key);
                    }
                }
                Action::Transfer { deposit } => {
                    let receiver = &transaction.receiver_id;
                    if receiver.is_implicit() && !keys.contains_key(receiver) {
                        let bytes = hex::decode(receiver.as_str()).unwrap();
                        let key = PublicKey::from_bytes(KeyAlgorithm::Ed25519, &bytes).unwrap();
                        keys.insert(receiver.clone(), vec![key]);
                    }
                    let mut balances = self.balances.lock().unwrap();
                    let balance = balances.entry(receiver.clone()).or_default();
                    *balance = NearToken::from_yocto(balance.as_yocto() + deposit.as_yocto());
                }
                Action::FunctionCall { .. } => {}
            }
        }
    }
}

#[async_trait]
impl ChainProvider for MockProvider {
    async fn access_keys(&self, account_id: &AccountId) -> Result<Vec<PublicKey>, ProviderError> {
        self.access_key_calls.fetch_add(1, Ordering::SeqCst);
        self.keys
            .lock()
            .unwrap()
            .get(account_id)
            .cloned()
            .ok_or_else(|| ProviderError::Rpc(format!("account {} does not exist", account_id)))
    }

    async fn balance(&self, account_id: &AccountId) -> Result<NearToken, ProviderError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(account_id)
            .copied()
            .unwrap_or_default())
    }

    async fn sign_and_send(
        &self,
        transaction: Transaction,
        signer: &Signer,
    ) -> Result<TxStatus, ProviderError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        assert!(
            self.keys_of(&transaction.signer_id)
                .contains(signer.public_key())
                || !self.keys.lock().unwrap().contains_key(&transaction.signer_id),
            "signer key is not authorized on {}",
            transaction.signer_id
        );
        self.sent.lock().unwrap().push(transaction.clone());

        let result = self
            .scripted
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(TxStatus::SuccessValue(String::new())));
        if let Ok(TxStatus::SuccessValue(_)) = &result {
            self.apply(&transaction);
        }
        result
    }
}

/// TEE double returning fixed key material and well-formed evidence
pub struct MockTee {
    pub key: Vec<u8>,
    pub fail: bool,
    pub get_key_calls: AtomicUsize,
    pub quote_calls: AtomicUsize,
}

impl Default for MockTee {
    fn default() -> Self {
        Self {
            key: vec![1u8; 32],
            fail: false,
            get_key_calls: AtomicUsize::new(0),
            quote_calls: AtomicUsize::new(0),
        }
    }
}

impl MockTee {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn quote_hex() -> String {
        format!("0x{}", "ab".repeat(100))
    }

    pub fn tcb_info() -> RawTcbInfo {
        RawTcbInfo {
            mrtd: Some("11".repeat(48)),
            rtmr0: Some("22".repeat(48)),
            rtmr1: Some("33".repeat(48)),
            rtmr2: Some("44".repeat(48)),
            rtmr3: Some("55".repeat(48)),
            os_image_hash: None,
            compose_hash: Some("66".repeat(32)),
            device_id: Some("77".repeat(32)),
            app_compose: Some("{\"runner\":\"docker-compose\"}".to_string()),
            event_log: Some(Vec::new()),
        }
    }

    pub fn collateral() -> RawCollateral {
        RawCollateral {
            pck_crl_issuer_chain: Some("issuer-chain".to_string()),
            root_ca_crl: Some("0a0b".to_string()),
            pck_crl: Some("0c0d".to_string()),
            tcb_info_issuer_chain: Some("tcb-chain".to_string()),
            tcb_info: Some("{\"version\":3}".to_string()),
            tcb_info_signature: Some("ee".repeat(64)),
            qe_identity_issuer_chain: Some("qe-chain".to_string()),
            qe_identity: Some("{\"id\":\"TD_QE\"}".to_string()),
            qe_identity_signature: Some("ff".repeat(64)),
        }
    }

    fn check(&self) -> shade_agent::Result<()> {
        if self.fail {
            Err(AgentError::DerivationFailure("TEE unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TeeSource for MockTee {
    async fn get_key(&self, _path: &str) -> shade_agent::Result<Vec<u8>> {
        self.get_key_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.key.clone())
    }

    async fn get_quote(&self, _report_data: &[u8]) -> shade_agent::Result<String> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(Self::quote_hex())
    }

    async fn info(&self) -> shade_agent::Result<RawTcbInfo> {
        self.check()?;
        Ok(Self::tcb_info())
    }

    async fn quote_collateral(&self, _quote_hex: &str) -> shade_agent::Result<RawCollateral> {
        self.check()?;
        Ok(Self::collateral())
    }
}

pub fn account(id: &str) -> AccountId {
    AccountId::new(id).unwrap()
}

pub fn key(byte: u8, provenance: Provenance) -> KeyMaterial {
    KeyMaterial::from_ed25519_seed(&[byte; 32], provenance)
}
