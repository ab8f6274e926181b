//! In-memory stand-in for a liteserver client

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::info;

use ton_http_api::{
    BlockLookup, BlockRef, BlockTransactionsQuery, ClientError, ClientResult, GetMethodId,
    LocateTx, MessageDirection, QueryMessage, RawAccountState, TonClient, TransactionId,
    TransactionsQuery,
};

/// Code bag of cells of the one wallet kind the mock knows about
pub const MOCK_WALLET_CODE: &[u8] = b"mock-gateway wallet code";

const ZERO_HASH: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

pub struct MockClient {
    seqno: Mutex<u32>,
    accounts: Mutex<HashMap<String, RawAccountState>>,
    started: u64,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            seqno: Mutex::new(1),
            accounts: Mutex::new(HashMap::new()),
            started: unix_now(),
        }
    }

    /// Seed an account so `getAddressInformation` has something to return
    pub fn with_account(self, address: impl Into<String>, state: RawAccountState) -> Self {
        self.accounts.lock().insert(address.into(), state);
        self
    }

    fn block_id(&self, workchain: i32, shard: i64, seqno: u32) -> Value {
        json!({
            "@type": "ton.blockIdExt",
            "workchain": workchain,
            "shard": shard.to_string(),
            "seqno": seqno,
            "root_hash": ZERO_HASH,
            "file_hash": ZERO_HASH,
        })
    }

    fn last_block(&self) -> Value {
        self.block_id(-1, i64::MIN, *self.seqno.lock())
    }

    // One block per message, so repeated sends are visible to callers.
    fn advance(&self) -> u32 {
        let mut seqno = self.seqno.lock();
        *seqno += 1;
        *seqno
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[async_trait]
impl TonClient for MockClient {
    async fn raw_get_account_state(&self, address: &str) -> ClientResult<RawAccountState> {
        Ok(self
            .accounts
            .lock()
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    async fn generic_get_account_state(&self, address: &str) -> ClientResult<Value> {
        let account = self.raw_get_account_state(address).await?;
        Ok(json!({
            "@type": "fullAccountState",
            "address": {"@type": "accountAddress", "account_address": address},
            "balance": account.balance.to_string(),
            "last_transaction_id": account.last_transaction_id,
            "account_state": {"@type": format!("{}.accountState", account.state().as_str())},
        }))
    }

    async fn get_transactions(&self, query: TransactionsQuery) -> ClientResult<Value> {
        let Some(account) = self.accounts.lock().get(&query.address).cloned() else {
            return Ok(json!([]));
        };
        let Some(last) = account.last_transaction_id else {
            return Ok(json!([]));
        };
        Ok(json!([{
            "@type": "raw.transaction",
            "transaction_id": last,
            "utime": self.started,
            "fee": "0",
        }]))
    }

    async fn get_masterchain_info(&self) -> ClientResult<Value> {
        Ok(json!({
            "@type": "blocks.masterchainInfo",
            "last": self.last_block(),
            "state_root_hash": ZERO_HASH,
            "init": self.block_id(-1, 0, 0),
        }))
    }

    async fn get_consensus_block(&self) -> ClientResult<Value> {
        Ok(json!({
            "consensus_block": *self.seqno.lock(),
            "timestamp": unix_now(),
        }))
    }

    async fn lookup_block(&self, lookup: BlockLookup) -> ClientResult<Value> {
        let current = *self.seqno.lock();
        match lookup.seqno {
            Some(seqno) if seqno > current => Err(ClientError::WrongResult(format!(
                "block {seqno} is not yet known"
            ))),
            Some(seqno) => Ok(self.block_id(lookup.workchain, lookup.shard, seqno)),
            None => Ok(self.block_id(lookup.workchain, lookup.shard, current)),
        }
    }

    async fn get_shards(&self, masterchain_seqno: u32) -> ClientResult<Value> {
        Ok(json!({
            "@type": "blocks.shards",
            "shards": [self.block_id(0, i64::MIN, masterchain_seqno)],
        }))
    }

    async fn get_block_transactions(&self, query: BlockTransactionsQuery) -> ClientResult<Value> {
        Ok(json!({
            "@type": "blocks.transactions",
            "id": self.block_id(query.block.workchain, query.block.shard, query.block.seqno),
            "req_count": query.count,
            "incomplete": false,
            "transactions": [],
        }))
    }

    async fn get_block_header(&self, block: BlockRef) -> ClientResult<Value> {
        Ok(json!({
            "@type": "blocks.header",
            "id": self.block_id(block.workchain, block.shard, block.seqno),
            "gen_utime": self.started,
        }))
    }

    async fn try_locate_tx(&self, query: LocateTx) -> ClientResult<Value> {
        let account = match query.direction {
            MessageDirection::Incoming => &query.destination,
            MessageDirection::Outgoing => &query.source,
        };
        Err(ClientError::WrongResult(format!(
            "no transaction of {account} at lt {} in the mock chain",
            query.created_lt
        )))
    }

    async fn raw_send_message(&self, boc: Vec<u8>) -> ClientResult<Value> {
        let seqno = self.advance();
        info!("Accepted external message of {} bytes in block {}", boc.len(), seqno);
        Ok(json!({"@type": "ok"}))
    }

    async fn raw_create_and_send_query(&self, message: QueryMessage) -> ClientResult<Value> {
        let seqno = self.advance();
        let mut accounts = self.accounts.lock();
        let account = accounts.entry(message.address.clone()).or_default();
        account.last_transaction_id = Some(TransactionId::new(u64::from(seqno) * 1_000_000, ZERO_HASH));
        info!("Query to {} included in block {}", message.address, seqno);
        Ok(json!({"@type": "ok"}))
    }

    async fn raw_estimate_fees(
        &self,
        message: QueryMessage,
        ignore_chksig: bool,
    ) -> ClientResult<Value> {
        let storage = (message.init_code.len() + message.init_data.len()) as u64;
        let forward = message.body.len() as u64 * 1_000;
        Ok(json!({
            "@type": "query.fees",
            "source_fees": {
                "@type": "fees",
                "in_fwd_fee": forward,
                "storage_fee": storage * 100,
                "gas_fee": if ignore_chksig { 0 } else { 10_000 },
                "fwd_fee": 0,
            },
            "destination_fees": [],
        }))
    }

    async fn raw_run_method(
        &self,
        address: &str,
        method: GetMethodId,
        _stack: Vec<Value>,
    ) -> ClientResult<Value> {
        let known = matches!(&method, GetMethodId::Name(name) if name == "seqno")
            || method == GetMethodId::Id(85143);
        if !known {
            return Ok(json!({"@type": "smc.runResult", "gas_used": 0, "stack": [], "exit_code": 11}));
        }

        let seqno = match self.accounts.lock().get(address) {
            Some(account) if !account.code.is_empty() => 1,
            _ => 0,
        };
        Ok(json!({
            "@type": "smc.runResult",
            "gas_used": 463,
            "stack": [["num", format!("0x{seqno:x}")]],
            "exit_code": 0,
        }))
    }
}
