//! Shared fixtures: a stub blockchain client and request helpers

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, StatusCode};
use parking_lot::Mutex;
use serde_json::{Value, json};

use ton_http_api::server::HttpApiServer;
use ton_http_api::{
    BlockLookup, BlockRef, BlockTransactionsQuery, BocCodec, CellCodec, ClientError, ClientResult,
    GetMethodId, LocateTx, MessageDirection, QueryMessage, RawAccountState, SeqnoWalletIdExtractor,
    Settings, TonClient, TonHttpApi, TransactionId, TransactionsQuery, WalletCatalog,
};

pub const ACTIVE: &str = "EQCD39VS5jcptHL8vMjEXrzGaRcCVYto7HUn4bpAOg8xqB2N";
pub const ACTIVE_RAW: &str = "0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8";
pub const OVERDRAWN: &str = "Ef/8uRo6OBbQ97jCx2EIuKm8Wmt6Vb15+KsQHFLbKSMiYDJ4";
pub const WALLET: &str = "Ef8zMzMzMzMzMzMzMzMzMzMzMzMzMzMzMzMzMzMzMzMzM0vF";

pub const WALLET_CODE: &[u8] = b"stub wallet code";

/// Client answering from fixed fixtures and recording what it was asked
#[derive(Default)]
pub struct StubClient {
    accounts: HashMap<String, RawAccountState>,
    masterchain_delay: Option<Duration>,
    pub calls: Mutex<Vec<Value>>,
    pub sent: Mutex<Vec<Vec<u8>>>,
}

impl StubClient {
    pub fn new() -> Self {
        let mut accounts = HashMap::new();
        accounts.insert(
            ACTIVE.to_string(),
            RawAccountState {
                balance: 1_500_000_000,
                code: "te6ccgEBAQEAAgAAAA==".into(),
                data: "te6ccgEBAQEAAgAAAA==".into(),
                last_transaction_id: Some(TransactionId::new(47597573000001, "AAAA")),
                ..Default::default()
            },
        );
        accounts.insert(
            OVERDRAWN.to_string(),
            RawAccountState {
                balance: -20,
                frozen_hash: "ZnJvemVu".into(),
                ..Default::default()
            },
        );

        let data = BocCodec
            .serialize_boc(&json!({
                "data": {"b64": STANDARD.encode([0, 0, 0, 7, 0x29, 0xa9, 0xa3, 0x17]), "len": 64}
            }))
            .unwrap();
        accounts.insert(
            WALLET.to_string(),
            RawAccountState {
                balance: 42,
                code: STANDARD.encode(WALLET_CODE),
                data: STANDARD.encode(data),
                ..Default::default()
            },
        );

        Self {
            accounts,
            ..Default::default()
        }
    }

    /// Make `getMasterchainInfo` hang for `delay`
    pub fn with_masterchain_delay(mut self, delay: Duration) -> Self {
        self.masterchain_delay = Some(delay);
        self
    }

    fn record(&self, call: Value) {
        self.calls.lock().push(call);
    }

    pub fn last_call(&self) -> Value {
        self.calls.lock().last().cloned().unwrap_or(Value::Null)
    }
}

fn message_json(message: &QueryMessage) -> Value {
    json!({
        "address": message.address,
        "body": message.body.len(),
        "init_code": message.init_code.len(),
        "init_data": message.init_data.len(),
    })
}

#[async_trait]
impl TonClient for StubClient {
    async fn raw_get_account_state(&self, address: &str) -> ClientResult<RawAccountState> {
        self.record(json!({"call": "raw_get_account_state", "address": address}));
        Ok(self.accounts.get(address).cloned().unwrap_or_default())
    }

    async fn generic_get_account_state(&self, address: &str) -> ClientResult<Value> {
        self.record(json!({"call": "generic_get_account_state", "address": address}));
        Ok(json!({"@type": "fullAccountState", "address": {"account_address": address}}))
    }

    async fn get_transactions(&self, query: TransactionsQuery) -> ClientResult<Value> {
        let call = json!({
            "call": "get_transactions",
            "address": query.address,
            "limit": query.limit,
            "from_lt": query.from_lt,
            "from_hash": query.from_hash,
            "to_lt": query.to_lt,
            "archival": query.archival,
        });
        self.record(call.clone());
        Ok(json!([call]))
    }

    async fn get_masterchain_info(&self) -> ClientResult<Value> {
        self.record(json!({"call": "get_masterchain_info"}));
        if let Some(delay) = self.masterchain_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(json!({"@type": "blocks.masterchainInfo", "last": {"seqno": 100}}))
    }

    async fn get_consensus_block(&self) -> ClientResult<Value> {
        Err(ClientError::Internal("liteserver socket closed".into()))
    }

    async fn lookup_block(&self, lookup: BlockLookup) -> ClientResult<Value> {
        self.record(json!({
            "call": "lookup_block",
            "workchain": lookup.workchain,
            "shard": lookup.shard,
            "seqno": lookup.seqno,
            "lt": lookup.lt,
            "unixtime": lookup.unixtime,
        }));
        Ok(json!({"@type": "ton.blockIdExt", "workchain": lookup.workchain}))
    }

    async fn get_shards(&self, masterchain_seqno: u32) -> ClientResult<Value> {
        if masterchain_seqno == 0 {
            return Err(ClientError::WrongResult("block not found".into()));
        }
        Ok(json!({"@type": "blocks.shards", "shards": []}))
    }

    async fn get_block_transactions(&self, query: BlockTransactionsQuery) -> ClientResult<Value> {
        self.record(json!({
            "call": "get_block_transactions",
            "seqno": query.block.seqno,
            "count": query.count,
            "after_lt": query.after_lt,
        }));
        Ok(json!({"@type": "blocks.transactions", "transactions": []}))
    }

    async fn get_block_header(&self, block: BlockRef) -> ClientResult<Value> {
        Ok(json!({"@type": "blocks.header", "id": {"seqno": block.seqno}}))
    }

    async fn try_locate_tx(&self, query: LocateTx) -> ClientResult<Value> {
        let direction = match query.direction {
            MessageDirection::Incoming => "incoming",
            MessageDirection::Outgoing => "outgoing",
        };
        Ok(json!({
            "direction": direction,
            "source": query.source,
            "destination": query.destination,
            "created_lt": query.created_lt,
        }))
    }

    async fn raw_send_message(&self, boc: Vec<u8>) -> ClientResult<Value> {
        self.sent.lock().push(boc);
        Ok(json!({"@type": "ok"}))
    }

    async fn raw_create_and_send_query(&self, message: QueryMessage) -> ClientResult<Value> {
        self.record(json!({"call": "send_query", "message": message_json(&message)}));
        Ok(json!({"@type": "ok"}))
    }

    async fn raw_estimate_fees(
        &self,
        message: QueryMessage,
        ignore_chksig: bool,
    ) -> ClientResult<Value> {
        self.record(json!({
            "call": "estimate_fees",
            "message": message_json(&message),
            "ignore_chksig": ignore_chksig,
        }));
        Ok(json!({"@type": "query.fees", "source_fees": {"gas_fee": 0}}))
    }

    async fn raw_run_method(
        &self,
        address: &str,
        method: GetMethodId,
        stack: Vec<Value>,
    ) -> ClientResult<Value> {
        if method == GetMethodId::Name("missing".into()) {
            return Err(ClientError::WrongResult("method not found, exit code 11".into()));
        }
        Ok(json!({"address": address, "method": method, "stack": stack, "exit_code": 0}))
    }
}

pub fn wallets() -> Arc<WalletCatalog> {
    Arc::new(WalletCatalog::new().register(
        WALLET_CODE,
        "wallet v3 r2",
        Arc::new(SeqnoWalletIdExtractor),
    ))
}

pub fn gateway(settings: Settings, client: Arc<StubClient>) -> HttpApiServer {
    TonHttpApi::new(settings)
        .client(client)
        .known_wallets(wallets())
        .build()
        .unwrap()
}

pub fn default_gateway() -> (HttpApiServer, Arc<StubClient>) {
    let client = Arc::new(StubClient::new());
    (gateway(Settings::default(), client.clone()), client)
}

pub fn peer() -> SocketAddr {
    SocketAddr::from(([198, 51, 100, 7], 51000))
}

pub fn get(uri: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

pub fn post(uri: &str, body: Value) -> Request<Full<Bytes>> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

pub fn rpc(body: Value) -> Request<Full<Bytes>> {
    post("/api/v2/jsonRPC", body)
}

pub async fn send(server: &HttpApiServer, req: Request<Full<Bytes>>) -> (StatusCode, Value) {
    let response = server.handle(req, Some(peer())).await;
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}
