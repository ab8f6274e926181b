//! Message submission and fee estimation.
//!
//! Plain variants take base64 bags of cells; `*Simple` variants take cell
//! objects and serialize them through the cell codec.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ton_http_api_json_rpc::prelude::*;
use ton_http_api_server::HttpApiServerBuilder;
use tracing::debug;

use super::{ApiContext, decode_base64, with_context};
use crate::address::prepare_address;
use crate::client::QueryMessage;

const CELL_PARSE_ERROR: &str = "Error while parsing cell";
const CELL_OBJECT_PARSE_ERROR: &str = "Error while parsing cell object";

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendBocParams {
    /// Base64 bag of cells of an external message
    pub boc: String,
}

impl MethodParams for SendBocParams {
    fn descriptor() -> ParameterDescriptor {
        ParameterDescriptor::new().required("boc", ParamKind::String)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendCellParams {
    pub cell: Value,
}

impl MethodParams for SendCellParams {
    fn descriptor() -> ParameterDescriptor {
        ParameterDescriptor::new().required("cell", ParamKind::Object)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    pub address: String,
    pub body: String,
    #[serde(default)]
    pub init_code: String,
    #[serde(default)]
    pub init_data: String,
}

fn query_descriptor() -> ParameterDescriptor {
    ParameterDescriptor::new()
        .required("address", ParamKind::String)
        .required("body", ParamKind::String)
        .optional("init_code", ParamKind::String, "")
        .optional("init_data", ParamKind::String, "")
}

impl MethodParams for QueryParams {
    fn descriptor() -> ParameterDescriptor {
        query_descriptor()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySimpleParams {
    pub address: String,
    pub body: Value,
    #[serde(default)]
    pub init_code: Option<Value>,
    #[serde(default)]
    pub init_data: Option<Value>,
}

fn query_simple_descriptor() -> ParameterDescriptor {
    ParameterDescriptor::new()
        .required("address", ParamKind::String)
        .required("body", ParamKind::Object)
        .nullable("init_code", ParamKind::OptionalObject)
        .nullable("init_data", ParamKind::OptionalObject)
}

impl MethodParams for QuerySimpleParams {
    fn descriptor() -> ParameterDescriptor {
        query_simple_descriptor()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateFeeParams {
    #[serde(flatten)]
    pub query: QueryParams,
    #[serde(default = "default_true")]
    pub ignore_chksig: bool,
}

impl MethodParams for EstimateFeeParams {
    fn descriptor() -> ParameterDescriptor {
        query_descriptor().optional("ignore_chksig", ParamKind::Boolean, true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateFeeSimpleParams {
    #[serde(flatten)]
    pub query: QuerySimpleParams,
    #[serde(default = "default_true")]
    pub ignore_chksig: bool,
}

impl MethodParams for EstimateFeeSimpleParams {
    fn descriptor() -> ParameterDescriptor {
        query_simple_descriptor().optional("ignore_chksig", ParamKind::Boolean, true)
    }
}

pub fn register(builder: HttpApiServerBuilder, ctx: &Arc<ApiContext>) -> HttpApiServerBuilder {
    builder
        .post("sendBoc", with_context(ctx, send_boc))
        .post("sendCellSimple", with_context(ctx, send_cell_simple))
        .post("sendQuery", with_context(ctx, send_query))
        .post("sendQuerySimple", with_context(ctx, send_query_simple))
        .post("estimateFee", with_context(ctx, estimate_fee))
        .post("estimateFeeSimple", with_context(ctx, estimate_fee_simple))
}

impl QueryParams {
    fn message(&self) -> Result<QueryMessage, GatewayError> {
        Ok(QueryMessage {
            address: prepare_address(&self.address)?,
            body: decode_base64("body", &self.body)?,
            init_code: decode_base64("init_code", &self.init_code)?,
            init_data: decode_base64("init_data", &self.init_data)?,
        })
    }
}

impl QuerySimpleParams {
    fn message(&self, ctx: &ApiContext) -> Result<QueryMessage, GatewayError> {
        let serialize = |cell: &Value| {
            ctx.cells.serialize_boc(cell).map_err(|err| {
                debug!("Rejecting cell object: {}", err);
                GatewayError::malformed(CELL_OBJECT_PARSE_ERROR)
            })
        };
        let optional = |cell: &Option<Value>| match cell {
            Some(cell) if !cell.is_null() => serialize(cell),
            _ => Ok(Vec::new()),
        };

        Ok(QueryMessage {
            address: prepare_address(&self.address)?,
            body: serialize(&self.body)?,
            init_code: optional(&self.init_code)?,
            init_data: optional(&self.init_data)?,
        })
    }
}

pub async fn send_boc(ctx: Arc<ApiContext>, params: SendBocParams) -> Result<Value, GatewayError> {
    let boc = decode_base64("boc", &params.boc)?;
    Ok(ctx.client.raw_send_message(boc).await?)
}

pub async fn send_cell_simple(
    ctx: Arc<ApiContext>,
    params: SendCellParams,
) -> Result<Value, GatewayError> {
    let boc = ctx.cells.serialize_boc(&params.cell).map_err(|err| {
        debug!("Rejecting cell: {}", err);
        GatewayError::malformed(CELL_PARSE_ERROR)
    })?;
    Ok(ctx.client.raw_send_message(boc).await?)
}

pub async fn send_query(ctx: Arc<ApiContext>, params: QueryParams) -> Result<Value, GatewayError> {
    let message = params.message()?;
    Ok(ctx.client.raw_create_and_send_query(message).await?)
}

pub async fn send_query_simple(
    ctx: Arc<ApiContext>,
    params: QuerySimpleParams,
) -> Result<Value, GatewayError> {
    let message = params.message(&ctx)?;
    Ok(ctx.client.raw_create_and_send_query(message).await?)
}

pub async fn estimate_fee(
    ctx: Arc<ApiContext>,
    params: EstimateFeeParams,
) -> Result<Value, GatewayError> {
    let message = params.query.message()?;
    Ok(ctx
        .client
        .raw_estimate_fees(message, params.ignore_chksig)
        .await?)
}

pub async fn estimate_fee_simple(
    ctx: Arc<ApiContext>,
    params: EstimateFeeSimpleParams,
) -> Result<Value, GatewayError> {
    let message = params.query.message(&ctx)?;
    Ok(ctx
        .client
        .raw_estimate_fees(message, params.ignore_chksig)
        .await?)
}
