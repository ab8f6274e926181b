//! # TON HTTP API
//!
//! Business methods of the TON HTTP API gateway and the wiring that puts
//! them behind [`ton_http_api_server::HttpApiServer`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ton_http_api::{Settings, TonHttpApi, TonClient};
//!
//! # async fn run(client: Arc<dyn TonClient>) -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load("settings.toml")?;
//! let server = TonHttpApi::new(settings).client(client).build()?;
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod cell;
pub mod client;
pub mod methods;
pub mod settings;
pub mod wallet;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use ton_http_api_server::{
    AccessLogMiddleware, HttpApiServer, HttpApiServerBuilder, RateLimitMiddleware,
};

pub use address::{Address, AddressError, AddressForm, DetectedAddress, detect_address, prepare_address};
pub use cell::{BocCodec, CellCodec, CellError};
pub use client::{
    AccountState, BlockLookup, BlockRef, BlockTransactionsQuery, ClientError, ClientResult,
    GetMethodId, LocateTx, MessageDirection, QueryMessage, RawAccountState, TonClient,
    TransactionId, TransactionsQuery,
};
pub use methods::ApiContext;
pub use settings::{Settings, SettingsError};
pub use wallet::{
    KnownWallets, SeqnoExtractor, SeqnoWalletIdExtractor, WalletCatalog, WalletDataExtractor,
    WalletInformation, WalletKind,
};

pub use ton_http_api_json_rpc as json_rpc;
pub use ton_http_api_server as server;

#[derive(Debug, Error)]
pub enum TonHttpApiError {
    #[error("no blockchain client configured")]
    MissingClient,

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Assembles the gateway from settings and collaborators
pub struct TonHttpApi {
    settings: Settings,
    client: Option<Arc<dyn TonClient>>,
    cells: Arc<dyn CellCodec>,
    wallets: Arc<dyn KnownWallets>,
}

impl TonHttpApi {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            client: None,
            cells: Arc::new(BocCodec),
            wallets: Arc::new(WalletCatalog::new()),
        }
    }

    pub fn client(mut self, client: Arc<dyn TonClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn cell_codec(mut self, cells: Arc<dyn CellCodec>) -> Self {
        self.cells = cells;
        self
    }

    pub fn known_wallets(mut self, wallets: Arc<dyn KnownWallets>) -> Self {
        self.wallets = wallets;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Server builder with every method and the configured middleware, for
    /// callers that want to add their own before building
    pub fn into_builder(self) -> Result<HttpApiServerBuilder, TonHttpApiError> {
        let client = self.client.ok_or(TonHttpApiError::MissingClient)?;
        let ctx = ApiContext::new(client, self.cells, self.wallets);

        let builder = HttpApiServer::builder().config(self.settings.to_server_config());
        let builder = methods::register_all(builder, &ctx, &self.settings.api);

        let endpoints = builder.method_names();
        info!("Registered {} methods", endpoints.len());

        let mut builder = builder.middleware(Arc::new(AccessLogMiddleware::new(endpoints.clone())));
        if self.settings.ratelimit.enabled {
            let policy = self.settings.ratelimit.policy();
            info!(
                "Rate limiting: {} anonymous requests per {}s, {} API keys",
                policy.anonymous_limit,
                policy.window.as_secs(),
                policy.keys.len()
            );
            builder = builder.middleware(Arc::new(RateLimitMiddleware::new(endpoints, policy)));
        }
        Ok(builder)
    }

    pub fn build(self) -> Result<HttpApiServer, TonHttpApiError> {
        Ok(self.into_builder()?.build())
    }
}
