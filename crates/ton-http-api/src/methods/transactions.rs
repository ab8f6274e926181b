//! Transaction history and transaction lookup by message.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ton_http_api_json_rpc::prelude::*;
use ton_http_api_server::HttpApiServerBuilder;

use super::{ApiContext, with_context};
use crate::address::prepare_address;
use crate::client::{LocateTx, MessageDirection, TransactionsQuery};

const DEFAULT_LIMIT: u32 = 10;

fn default_limit() -> Option<u32> {
    Some(DEFAULT_LIMIT)
}

fn default_to_lt() -> Option<u64> {
    Some(0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionsParams {
    pub address: String,
    /// An explicit null falls back to the default
    #[serde(default = "default_limit")]
    pub limit: Option<u32>,
    /// Logical time of the transaction to start from
    #[serde(default)]
    pub lt: Option<u64>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default = "default_to_lt")]
    pub to_lt: Option<u64>,
    #[serde(default)]
    pub archival: bool,
}

impl MethodParams for TransactionsParams {
    fn descriptor() -> ParameterDescriptor {
        ParameterDescriptor::new()
            .required("address", ParamKind::String)
            .optional("limit", ParamKind::OptionalInteger, DEFAULT_LIMIT)
            .nullable("lt", ParamKind::OptionalInteger)
            .nullable("hash", ParamKind::OptionalString)
            .optional("to_lt", ParamKind::OptionalInteger, 0)
            .optional("archival", ParamKind::Boolean, false)
    }
}

/// A message identified by its endpoints and creation logical time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocateTxParams {
    pub source: String,
    pub destination: String,
    pub created_lt: u64,
}

impl MethodParams for LocateTxParams {
    fn descriptor() -> ParameterDescriptor {
        ParameterDescriptor::new()
            .required("source", ParamKind::String)
            .required("destination", ParamKind::String)
            .required("created_lt", ParamKind::Integer)
    }
}

pub fn register(builder: HttpApiServerBuilder, ctx: &Arc<ApiContext>) -> HttpApiServerBuilder {
    builder
        .get("getTransactions", with_context(ctx, get_transactions))
        .get("tryLocateTx", with_context(ctx, try_locate_tx))
        .get("tryLocateResultTx", with_context(ctx, try_locate_result_tx))
        .get("tryLocateSourceTx", with_context(ctx, try_locate_source_tx))
}

pub async fn get_transactions(
    ctx: Arc<ApiContext>,
    params: TransactionsParams,
) -> Result<Value, GatewayError> {
    let query = TransactionsQuery {
        address: prepare_address(&params.address)?,
        limit: params.limit.unwrap_or(DEFAULT_LIMIT),
        from_lt: params.lt,
        from_hash: params.hash,
        to_lt: params.to_lt.unwrap_or(0),
        archival: params.archival,
    };
    Ok(ctx.client.get_transactions(query).await?)
}

async fn locate(
    ctx: &ApiContext,
    params: LocateTxParams,
    direction: MessageDirection,
) -> Result<Value, GatewayError> {
    let query = LocateTx {
        source: prepare_address(&params.source)?,
        destination: prepare_address(&params.destination)?,
        created_lt: params.created_lt,
        direction,
    };
    Ok(ctx.client.try_locate_tx(query).await?)
}

/// Transaction of the destination that processed the message
pub async fn try_locate_tx(
    ctx: Arc<ApiContext>,
    params: LocateTxParams,
) -> Result<Value, GatewayError> {
    locate(&ctx, params, MessageDirection::Incoming).await
}

/// Same lookup as [`try_locate_tx`], kept as a separate name for callers
pub async fn try_locate_result_tx(
    ctx: Arc<ApiContext>,
    params: LocateTxParams,
) -> Result<Value, GatewayError> {
    locate(&ctx, params, MessageDirection::Incoming).await
}

/// Transaction of the source that emitted the message
pub async fn try_locate_source_tx(
    ctx: Arc<ApiContext>,
    params: LocateTxParams,
) -> Result<Value, GatewayError> {
    locate(&ctx, params, MessageDirection::Outgoing).await
}
