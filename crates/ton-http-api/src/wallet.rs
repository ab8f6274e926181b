//! Wallet classification by contract code hash.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::client::{AccountState, TransactionId};

/// Hex sha256 of a contract's code bag of cells
pub fn code_hash(code: &[u8]) -> String {
    hex::encode(Sha256::digest(code))
}

/// Reads wallet-specific fields from the root cell of a wallet's data
pub trait WalletDataExtractor: Send + Sync {
    fn extract(&self, data: &[u8]) -> Map<String, Value>;
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// `seqno:uint32 public_key:bits256` (wallet v1, v2)
#[derive(Debug, Clone, Copy, Default)]
pub struct SeqnoExtractor;

impl WalletDataExtractor for SeqnoExtractor {
    fn extract(&self, data: &[u8]) -> Map<String, Value> {
        let mut fields = Map::new();
        if let Some(seqno) = read_u32(data, 0) {
            fields.insert("seqno".into(), json!(seqno));
        }
        fields
    }
}

/// `seqno:uint32 wallet_id:uint32 public_key:bits256` (wallet v3 and later)
#[derive(Debug, Clone, Copy, Default)]
pub struct SeqnoWalletIdExtractor;

impl WalletDataExtractor for SeqnoWalletIdExtractor {
    fn extract(&self, data: &[u8]) -> Map<String, Value> {
        let mut fields = SeqnoExtractor.extract(data);
        if let Some(wallet_id) = read_u32(data, 4) {
            fields.insert("wallet_id".into(), json!(wallet_id));
        }
        fields
    }
}

/// A recognised wallet contract
#[derive(Clone)]
pub struct WalletKind {
    pub wallet_type: String,
    pub extractor: Arc<dyn WalletDataExtractor>,
}

impl fmt::Debug for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletKind")
            .field("wallet_type", &self.wallet_type)
            .finish()
    }
}

/// Maps code hashes to wallet kinds
pub trait KnownWallets: Send + Sync {
    fn classify(&self, code_hash_hex: &str) -> Option<WalletKind>;
}

/// In-memory [`KnownWallets`] table filled at startup
#[derive(Debug, Clone, Default)]
pub struct WalletCatalog {
    kinds: HashMap<String, WalletKind>,
}

impl WalletCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wallet by its code bag of cells
    pub fn register(
        self,
        code: &[u8],
        wallet_type: impl Into<String>,
        extractor: Arc<dyn WalletDataExtractor>,
    ) -> Self {
        self.register_hash(code_hash(code), wallet_type, extractor)
    }

    pub fn register_hash(
        mut self,
        code_hash_hex: impl Into<String>,
        wallet_type: impl Into<String>,
        extractor: Arc<dyn WalletDataExtractor>,
    ) -> Self {
        self.kinds.insert(
            code_hash_hex.into().to_lowercase(),
            WalletKind {
                wallet_type: wallet_type.into(),
                extractor,
            },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl KnownWallets for WalletCatalog {
    fn classify(&self, code_hash_hex: &str) -> Option<WalletKind> {
        self.kinds.get(&code_hash_hex.to_lowercase()).cloned()
    }
}

/// Result of `getWalletInformation`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletInformation {
    pub wallet: bool,
    pub balance: String,
    pub account_state: AccountState,
    pub wallet_type: Option<String>,
    pub seqno: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transaction_id: Option<TransactionId>,
    /// Extra fields reported by the wallet's extractor, e.g. `wallet_id`
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl WalletInformation {
    /// Fill in the wallet fields from the extractor output
    pub fn apply(&mut self, kind: &WalletKind, mut fields: Map<String, Value>) {
        self.wallet = true;
        self.wallet_type = Some(kind.wallet_type.clone());
        self.seqno = fields
            .remove("seqno")
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok());
        self.details = fields;
    }
}
