//! Business methods.
//!
//! Each method is a plain async function taking the shared [`ApiContext`]
//! and its parameter struct, and returning a domain value. Registration on
//! the server builder exposes it on both transports.

pub mod accounts;
pub mod blocks;
pub mod run_method;
pub mod send;
pub mod transactions;

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ton_http_api_json_rpc::GatewayError;
use ton_http_api_server::HttpApiServerBuilder;
use tracing::debug;

use crate::cell::CellCodec;
use crate::client::TonClient;
use crate::settings::ApiSection;
use crate::wallet::KnownWallets;

/// Collaborators shared by every method
pub struct ApiContext {
    pub client: Arc<dyn TonClient>,
    pub cells: Arc<dyn CellCodec>,
    pub wallets: Arc<dyn KnownWallets>,
}

impl ApiContext {
    pub fn new(
        client: Arc<dyn TonClient>,
        cells: Arc<dyn CellCodec>,
        wallets: Arc<dyn KnownWallets>,
    ) -> Arc<Self> {
        Arc::new(Self {
            client,
            cells,
            wallets,
        })
    }
}

/// Adapt `f(ctx, params)` to the `f(params)` shape the server registers
pub fn with_context<P, F, Fut>(
    ctx: &Arc<ApiContext>,
    f: F,
) -> impl Fn(P) -> Fut + Send + Sync + 'static
where
    P: 'static,
    F: Fn(Arc<ApiContext>, P) -> Fut + Send + Sync + 'static,
    Fut: 'static,
{
    let ctx = Arc::clone(ctx);
    move |params| f(Arc::clone(&ctx), params)
}

/// Register every method. `runGetMethod` only when get-methods are enabled.
pub fn register_all(
    builder: HttpApiServerBuilder,
    ctx: &Arc<ApiContext>,
    api: &ApiSection,
) -> HttpApiServerBuilder {
    let builder = accounts::register(builder, ctx);
    let builder = transactions::register(builder, ctx);
    let builder = blocks::register(builder, ctx);
    let builder = send::register(builder, ctx);

    if api.get_methods {
        run_method::register(builder, ctx)
    } else {
        debug!("runGetMethod disabled");
        builder
    }
}

/// Decode a base64 payload field. Line-wrapped input (MIME style, 76
/// columns) is accepted, so all ASCII whitespace is dropped first.
pub(crate) fn decode_base64(field: &str, text: &str) -> Result<Vec<u8>, GatewayError> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|_| GatewayError::malformed(format!("Invalid base64 in '{field}'")))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64() {
        assert_eq!(decode_base64("boc", "AAE=").unwrap(), vec![0, 1]);
        assert!(decode_base64("boc", "").unwrap().is_empty());

        assert_eq!(decode_base64("boc", " AA\r\nE=\n").unwrap(), vec![0, 1]);

        let err = decode_base64("boc", "***").unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), "Invalid base64 in 'boc'");
    }
}
