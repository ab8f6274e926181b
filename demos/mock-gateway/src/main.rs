//! TON HTTP API gateway over an in-memory mock chain
//!
//! ```text
//! cargo run -p mock-gateway -- --config demos/mock-gateway/settings.toml
//! curl 'http://127.0.0.1:8081/api/v2/getMasterchainInfo'
//! curl -X POST http://127.0.0.1:8081/api/v2/jsonRPC \
//!      -d '{"method":"detectAddress","params":{"address":"EQCD39VS5jcptHL8vMjEXrzGaRcCVYto7HUn4bpAOg8xqB2N"},"id":1}'
//! ```

mod mock_client;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mock_client::{MOCK_WALLET_CODE, MockClient};
use ton_http_api::{
    BocCodec, CellCodec, RawAccountState, SeqnoWalletIdExtractor, Settings, TonHttpApi,
    TransactionId, WalletCatalog,
};

#[derive(Parser)]
#[command(name = "mock-gateway", about = "TON HTTP API gateway over a mock chain")]
struct Args {
    /// Settings file
    #[arg(short, long, env = "TON_API_CONFIG", default_value = "demos/mock-gateway/settings.toml")]
    config: PathBuf,

    /// Override `server.bind_address`
    #[arg(short, long, env = "TON_API_BIND")]
    bind: Option<SocketAddr>,

    /// Disable the JSON-RPC endpoint
    #[arg(long)]
    no_json_rpc: bool,
}

/// Demo account, a wallet of the mock's known kind
const DEMO_WALLET: &str = "EQCD39VS5jcptHL8vMjEXrzGaRcCVYto7HUn4bpAOg8xqB2N";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(bind) = args.bind {
        settings.server.bind_address = bind;
    }
    if args.no_json_rpc {
        settings.api.json_rpc = false;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))
        .context("invalid logging level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Unreadable liteserver config aborts startup
    settings
        .load_liteserver_config()
        .context("liteserver config")?;
    let keystore = settings.prepare_keystore()?;
    info!("Keystore at {}", keystore.display());

    // seqno 1, wallet id 698983191
    let wallet_data = BocCodec.serialize_boc(&json!({
        "data": {"b64": STANDARD.encode([0, 0, 0, 1, 0x29, 0xa9, 0xa3, 0x17]), "len": 64}
    }))?;
    let client = MockClient::new().with_account(
        DEMO_WALLET,
        RawAccountState {
            balance: 5_000_000_000,
            code: STANDARD.encode(MOCK_WALLET_CODE),
            data: STANDARD.encode(wallet_data),
            last_transaction_id: Some(TransactionId::new(1_000_000, "AAAA")),
            ..Default::default()
        },
    );
    let wallets = WalletCatalog::new().register(
        MOCK_WALLET_CODE,
        "wallet v3 r2",
        Arc::new(SeqnoWalletIdExtractor),
    );

    let server = TonHttpApi::new(settings)
        .client(Arc::new(client))
        .known_wallets(Arc::new(wallets))
        .build()?;

    server.run().await?;
    Ok(())
}
