//! Account and address methods.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use ton_http_api_json_rpc::prelude::*;
use ton_http_api_server::HttpApiServerBuilder;
use tracing::{debug, warn};

use super::{ApiContext, decode_base64, with_context};
use crate::address::{DetectedAddress, detect_address, prepare_address};
use crate::client::RawAccountState;
use crate::wallet::{WalletInformation, code_hash};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressParams {
    pub address: String,
}

impl MethodParams for AddressParams {
    fn descriptor() -> ParameterDescriptor {
        ParameterDescriptor::new().required("address", ParamKind::String)
    }
}

pub fn register(builder: HttpApiServerBuilder, ctx: &Arc<ApiContext>) -> HttpApiServerBuilder {
    builder
        .get("getAddressInformation", with_context(ctx, get_address_information))
        .get(
            "getExtendedAddressInformation",
            with_context(ctx, get_extended_address_information),
        )
        .get("getWalletInformation", with_context(ctx, get_wallet_information))
        .get("getAddressBalance", with_context(ctx, get_address_balance))
        .get("getAddressState", with_context(ctx, get_address_state))
        .get("packAddress", with_context(ctx, pack_address))
        .get("unpackAddress", with_context(ctx, unpack_address))
        .get("detectAddress", with_context(ctx, detect))
}

async fn account_state(ctx: &ApiContext, address: &str) -> Result<RawAccountState, GatewayError> {
    let address = prepare_address(address)?;
    Ok(ctx.client.raw_get_account_state(&address).await?)
}

/// Raw account state plus its derived `state`; negative balances read as 0
pub async fn get_address_information(
    ctx: Arc<ApiContext>,
    params: AddressParams,
) -> Result<Value, GatewayError> {
    let mut account = account_state(&ctx, &params.address).await?;
    let state = account.state();
    account.balance = account.clamped_balance();

    let mut value = serde_json::to_value(&account).map_err(GatewayError::internal)?;
    value["state"] = json!(state);
    Ok(value)
}

pub async fn get_extended_address_information(
    ctx: Arc<ApiContext>,
    params: AddressParams,
) -> Result<Value, GatewayError> {
    let address = prepare_address(&params.address)?;
    Ok(ctx.client.generic_get_account_state(&address).await?)
}

pub async fn get_wallet_information(
    ctx: Arc<ApiContext>,
    params: AddressParams,
) -> Result<WalletInformation, GatewayError> {
    let account = account_state(&ctx, &params.address).await?;

    let mut info = WalletInformation {
        wallet: false,
        balance: account.clamped_balance().to_string(),
        account_state: account.state(),
        wallet_type: None,
        seqno: None,
        last_transaction_id: account.last_transaction_id.clone(),
        details: Default::default(),
    };

    if account.code.is_empty() {
        return Ok(info);
    }

    let code = match decode_base64("code", &account.code) {
        Ok(code) => code,
        Err(_) => {
            warn!("Account {} reported undecodable code", params.address);
            return Ok(info);
        }
    };

    let hash = code_hash(&code);
    let Some(kind) = ctx.wallets.classify(&hash) else {
        debug!("Code hash {} is not a known wallet", hash);
        return Ok(info);
    };

    let fields = decode_base64("data", &account.data)
        .ok()
        .and_then(|boc| ctx.cells.root_cell_data(&boc).ok())
        .map(|data| kind.extractor.extract(&data))
        .unwrap_or_else(|| {
            warn!("Could not read wallet data of {}", params.address);
            Default::default()
        });
    info.apply(&kind, fields);
    Ok(info)
}

pub async fn get_address_balance(
    ctx: Arc<ApiContext>,
    params: AddressParams,
) -> Result<String, GatewayError> {
    let account = account_state(&ctx, &params.address).await?;
    Ok(account.clamped_balance().to_string())
}

pub async fn get_address_state(
    ctx: Arc<ApiContext>,
    params: AddressParams,
) -> Result<&'static str, GatewayError> {
    let account = account_state(&ctx, &params.address).await?;
    Ok(account.state().as_str())
}

/// User-friendly form of an address
pub async fn pack_address(
    _ctx: Arc<ApiContext>,
    params: AddressParams,
) -> Result<String, GatewayError> {
    Ok(prepare_address(&params.address)?)
}

/// Raw form of an address
pub async fn unpack_address(
    _ctx: Arc<ApiContext>,
    params: AddressParams,
) -> Result<String, GatewayError> {
    Ok(detect_address(&params.address)?.raw_form)
}

pub async fn detect(
    _ctx: Arc<ApiContext>,
    params: AddressParams,
) -> Result<DetectedAddress, GatewayError> {
    Ok(detect_address(&params.address)?)
}
