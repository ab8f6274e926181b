//! Contract of the blockchain client the gateway forwards to.
//!
//! The client is an opaque async service shared by every request. Results
//! are passed through to callers as the client shaped them, except for the
//! raw account state, which the account methods inspect.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;
use ton_http_api_json_rpc::GatewayError;

/// Failures reported by a [`TonClient`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// The liteserver answered, but not with what was asked for. The text is
    /// shown to the caller.
    #[error("{0}")]
    WrongResult(String),

    #[error("liteserver timeout")]
    Timeout,

    /// Anything else; logged, never shown
    #[error("client error: {0}")]
    Internal(String),
}

impl From<ClientError> for GatewayError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::WrongResult(text) => GatewayError::WrongResult(text),
            ClientError::Timeout => GatewayError::Timeout,
            ClientError::Internal(detail) => GatewayError::Internal(detail),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// `(lt, hash)` pair identifying a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionId {
    #[serde(rename = "@type", default = "transaction_id_type")]
    pub kind: String,
    pub lt: String,
    pub hash: String,
}

fn transaction_id_type() -> String {
    "internal.transactionId".to_string()
}

impl TransactionId {
    pub fn new(lt: u64, hash: impl Into<String>) -> Self {
        Self {
            kind: transaction_id_type(),
            lt: lt.to_string(),
            hash: hash.into(),
        }
    }
}

/// Lifecycle state derived from an account's code and frozen hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountState {
    Uninitialized,
    Frozen,
    Active,
}

impl AccountState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountState::Uninitialized => "uninitialized",
            AccountState::Frozen => "frozen",
            AccountState::Active => "active",
        }
    }
}

// Balances arrive as decimal strings or plain numbers and go out as strings.
mod balance {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i128),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &i128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i128, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(value),
            Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Account state as returned by the raw account query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAccountState {
    #[serde(with = "balance", default)]
    pub balance: i128,
    /// Base64 bag of cells; empty when there is no code
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub frozen_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transaction_id: Option<TransactionId>,
    /// Fields the gateway does not interpret, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawAccountState {
    pub fn state(&self) -> AccountState {
        match (self.code.is_empty(), self.frozen_hash.is_empty()) {
            (false, _) => AccountState::Active,
            (true, true) => AccountState::Uninitialized,
            (true, false) => AccountState::Frozen,
        }
    }

    /// Balance with negative values reported as zero
    pub fn clamped_balance(&self) -> i128 {
        self.balance.max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionsQuery {
    pub address: String,
    pub limit: u32,
    pub from_lt: Option<u64>,
    pub from_hash: Option<String>,
    pub to_lt: u64,
    pub archival: bool,
}

/// Block coordinates for lookups; one of `seqno`, `lt`, `unixtime` is used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLookup {
    pub workchain: i32,
    pub shard: i64,
    pub seqno: Option<u32>,
    pub lt: Option<u64>,
    pub unixtime: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRef {
    pub workchain: i32,
    pub shard: i64,
    pub seqno: u32,
    pub root_hash: Option<String>,
    pub file_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTransactionsQuery {
    pub block: BlockRef,
    pub count: u32,
    pub after_lt: Option<u64>,
    pub after_hash: Option<String>,
}

/// Message direction used to locate a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    /// Find the destination's transaction triggered by the message
    Incoming,
    /// Find the source's transaction that emitted the message
    Outgoing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocateTx {
    pub source: String,
    pub destination: String,
    pub created_lt: u64,
    pub direction: MessageDirection,
}

/// External message parts, already decoded to bag-of-cells bytes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryMessage {
    pub address: String,
    pub body: Vec<u8>,
    pub init_code: Vec<u8>,
    pub init_data: Vec<u8>,
}

/// Get-method selector: by name or by numeric id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GetMethodId {
    Id(i64),
    Name(String),
}

/// Async blockchain client.
///
/// Implementations must be safe to share across concurrent requests. The
/// gateway never retries; a dropped future must cancel the pending call.
#[async_trait]
pub trait TonClient: Send + Sync {
    async fn raw_get_account_state(&self, address: &str) -> ClientResult<RawAccountState>;

    async fn generic_get_account_state(&self, address: &str) -> ClientResult<Value>;

    async fn get_transactions(&self, query: TransactionsQuery) -> ClientResult<Value>;

    async fn get_masterchain_info(&self) -> ClientResult<Value>;

    async fn get_consensus_block(&self) -> ClientResult<Value>;

    async fn lookup_block(&self, lookup: BlockLookup) -> ClientResult<Value>;

    async fn get_shards(&self, masterchain_seqno: u32) -> ClientResult<Value>;

    async fn get_block_transactions(&self, query: BlockTransactionsQuery) -> ClientResult<Value>;

    async fn get_block_header(&self, block: BlockRef) -> ClientResult<Value>;

    async fn try_locate_tx(&self, query: LocateTx) -> ClientResult<Value>;

    async fn raw_send_message(&self, boc: Vec<u8>) -> ClientResult<Value>;

    async fn raw_create_and_send_query(&self, message: QueryMessage) -> ClientResult<Value>;

    async fn raw_estimate_fees(&self, message: QueryMessage, ignore_chksig: bool)
    -> ClientResult<Value>;

    async fn raw_run_method(
        &self,
        address: &str,
        method: GetMethodId,
        stack: Vec<Value>,
    ) -> ClientResult<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_account_state_derivation() {
        let mut state = RawAccountState::default();
        assert_eq!(state.state(), AccountState::Uninitialized);

        state.frozen_hash = "ZnJvemVu".into();
        assert_eq!(state.state(), AccountState::Frozen);

        state.code = "te6ccgEBAQEAAgAAAA==".into();
        assert_eq!(state.state(), AccountState::Active);
    }

    #[test]
    fn test_balance_accepts_string_and_number() {
        let from_text: RawAccountState =
            serde_json::from_value(json!({"balance": "-5", "sync_utime": 1700000000})).unwrap();
        assert_eq!(from_text.balance, -5);
        assert_eq!(from_text.clamped_balance(), 0);
        assert_eq!(from_text.extra["sync_utime"], json!(1700000000));

        let from_number: RawAccountState =
            serde_json::from_value(json!({"balance": 1_000_000_000u64})).unwrap();
        assert_eq!(from_number.clamped_balance(), 1_000_000_000);
    }

    #[test]
    fn test_raw_state_serialization_passes_extra_fields() {
        let state: RawAccountState = serde_json::from_value(json!({
            "@type": "raw.fullAccountState",
            "balance": 42,
            "code": "",
            "data": "",
            "frozen_hash": "",
            "last_transaction_id": {"@type": "internal.transactionId", "lt": "1", "hash": "AA=="}
        }))
        .unwrap();

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["@type"], json!("raw.fullAccountState"));
        assert_eq!(value["balance"], json!("42"));
        assert_eq!(value["last_transaction_id"]["lt"], json!("1"));
    }

    #[test]
    fn test_get_method_id_untagged() {
        assert_eq!(
            serde_json::from_value::<GetMethodId>(json!("seqno")).unwrap(),
            GetMethodId::Name("seqno".into())
        );
        assert_eq!(
            serde_json::from_value::<GetMethodId>(json!(85143)).unwrap(),
            GetMethodId::Id(85143)
        );
    }

    #[test]
    fn test_client_error_mapping() {
        assert_eq!(
            GatewayError::from(ClientError::WrongResult("exit code 11".into())),
            GatewayError::WrongResult("exit code 11".into())
        );
        assert_eq!(GatewayError::from(ClientError::Timeout), GatewayError::Timeout);
        assert_eq!(
            GatewayError::from(ClientError::Internal("socket".into())).to_string(),
            "Internal server error"
        );
    }
}
