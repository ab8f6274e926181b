//! Masterchain, shard and block queries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ton_http_api_json_rpc::prelude::*;
use ton_http_api_server::HttpApiServerBuilder;

use super::{ApiContext, with_context};
use crate::client::{BlockLookup, BlockRef, BlockTransactionsQuery};

const DEFAULT_BLOCK_TX_COUNT: u32 = 40;

fn default_count() -> Option<u32> {
    Some(DEFAULT_BLOCK_TX_COUNT)
}

/// Locate a block by one of `seqno`, `lt` or `unixtime`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupBlockParams {
    pub workchain: i32,
    pub shard: i64,
    #[serde(default)]
    pub seqno: Option<u32>,
    #[serde(default)]
    pub lt: Option<u64>,
    #[serde(default)]
    pub unixtime: Option<u64>,
}

impl MethodParams for LookupBlockParams {
    fn descriptor() -> ParameterDescriptor {
        ParameterDescriptor::new()
            .required("workchain", ParamKind::Integer)
            .required("shard", ParamKind::Integer)
            .nullable("seqno", ParamKind::OptionalInteger)
            .nullable("lt", ParamKind::OptionalInteger)
            .nullable("unixtime", ParamKind::OptionalInteger)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardsParams {
    /// Masterchain block seqno
    pub seqno: u32,
}

impl MethodParams for ShardsParams {
    fn descriptor() -> ParameterDescriptor {
        ParameterDescriptor::new().required("seqno", ParamKind::Integer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeaderParams {
    pub workchain: i32,
    pub shard: i64,
    pub seqno: u32,
    #[serde(default)]
    pub root_hash: Option<String>,
    #[serde(default)]
    pub file_hash: Option<String>,
}

impl BlockHeaderParams {
    fn block(&self) -> BlockRef {
        BlockRef {
            workchain: self.workchain,
            shard: self.shard,
            seqno: self.seqno,
            root_hash: self.root_hash.clone(),
            file_hash: self.file_hash.clone(),
        }
    }
}

fn block_descriptor() -> ParameterDescriptor {
    ParameterDescriptor::new()
        .required("workchain", ParamKind::Integer)
        .required("shard", ParamKind::Integer)
        .required("seqno", ParamKind::Integer)
        .nullable("root_hash", ParamKind::OptionalString)
        .nullable("file_hash", ParamKind::OptionalString)
}

impl MethodParams for BlockHeaderParams {
    fn descriptor() -> ParameterDescriptor {
        block_descriptor()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockTransactionsParams {
    #[serde(flatten)]
    pub block: BlockHeaderParams,
    #[serde(default)]
    pub after_lt: Option<u64>,
    #[serde(default)]
    pub after_hash: Option<String>,
    /// An explicit null falls back to the default
    #[serde(default = "default_count")]
    pub count: Option<u32>,
}

impl MethodParams for BlockTransactionsParams {
    fn descriptor() -> ParameterDescriptor {
        block_descriptor()
            .nullable("after_lt", ParamKind::OptionalInteger)
            .nullable("after_hash", ParamKind::OptionalString)
            .optional("count", ParamKind::OptionalInteger, DEFAULT_BLOCK_TX_COUNT)
    }
}

pub fn register(builder: HttpApiServerBuilder, ctx: &Arc<ApiContext>) -> HttpApiServerBuilder {
    builder
        .get("getMasterchainInfo", with_context(ctx, get_masterchain_info))
        .get("getConsensusBlock", with_context(ctx, get_consensus_block))
        .get("lookupBlock", with_context(ctx, lookup_block))
        .get("shards", with_context(ctx, shards))
        .get("getBlockTransactions", with_context(ctx, get_block_transactions))
        .get("getBlockHeader", with_context(ctx, get_block_header))
}

pub async fn get_masterchain_info(ctx: Arc<ApiContext>, _: NoParams) -> Result<Value, GatewayError> {
    Ok(ctx.client.get_masterchain_info().await?)
}

pub async fn get_consensus_block(ctx: Arc<ApiContext>, _: NoParams) -> Result<Value, GatewayError> {
    Ok(ctx.client.get_consensus_block().await?)
}

pub async fn lookup_block(
    ctx: Arc<ApiContext>,
    params: LookupBlockParams,
) -> Result<Value, GatewayError> {
    let lookup = BlockLookup {
        workchain: params.workchain,
        shard: params.shard,
        seqno: params.seqno,
        lt: params.lt,
        unixtime: params.unixtime,
    };
    Ok(ctx.client.lookup_block(lookup).await?)
}

pub async fn shards(ctx: Arc<ApiContext>, params: ShardsParams) -> Result<Value, GatewayError> {
    Ok(ctx.client.get_shards(params.seqno).await?)
}

pub async fn get_block_transactions(
    ctx: Arc<ApiContext>,
    params: BlockTransactionsParams,
) -> Result<Value, GatewayError> {
    let query = BlockTransactionsQuery {
        block: params.block.block(),
        count: params.count.unwrap_or(DEFAULT_BLOCK_TX_COUNT),
        after_lt: params.after_lt,
        after_hash: params.after_hash,
    };
    Ok(ctx.client.get_block_transactions(query).await?)
}

pub async fn get_block_header(
    ctx: Arc<ApiContext>,
    params: BlockHeaderParams,
) -> Result<Value, GatewayError> {
    Ok(ctx.client.get_block_header(params.block()).await?)
}
