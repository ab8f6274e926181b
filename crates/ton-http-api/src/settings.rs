//! TOML settings.
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0:8081"
//! base_path = "/api/v2"
//!
//! [tonlib]
//! liteserver_config = "liteserver_config.json"
//! keystore = "ton_keystore"
//! request_timeout_ms = 10000
//!
//! [api]
//! json_rpc = true
//! get_methods = true
//!
//! [ratelimit]
//! enabled = true
//! anonymous_limit = 1
//! window_secs = 1
//! keys = { partner = 10 }
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every section and field is optional.

use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};
use ton_http_api_server::{RateLimitPolicy, ServerConfig};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid liteserver config {path}: {reason}")]
    LiteserverConfig { path: PathBuf, reason: String },

    #[error("failed to prepare keystore {path}: {source}")]
    Keystore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSection,
    pub tonlib: TonlibSection,
    pub api: ApiSection,
    pub ratelimit: RateLimitSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind_address: SocketAddr,
    pub base_path: String,
    pub json_rpc_path: String,
    pub cors: bool,
    pub max_body_size: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            bind_address: defaults.bind_address,
            base_path: defaults.base_path,
            json_rpc_path: defaults.json_rpc_path,
            cors: defaults.enable_cors,
            max_body_size: defaults.max_body_size,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TonlibSection {
    pub liteserver_config: PathBuf,
    pub keystore: PathBuf,
    pub request_timeout_ms: u64,
}

impl Default for TonlibSection {
    fn default() -> Self {
        Self {
            liteserver_config: PathBuf::from("liteserver_config.json"),
            keystore: PathBuf::from("ton_keystore"),
            request_timeout_ms: 10_000,
        }
    }
}

/// Endpoint toggles
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub json_rpc: bool,
    pub get_methods: bool,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            json_rpc: true,
            get_methods: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    pub enabled: bool,
    pub anonymous_limit: u32,
    pub window_secs: u64,
    /// API key to requests per window
    pub keys: HashMap<String, u32>,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        let defaults = RateLimitPolicy::default();
        Self {
            enabled: false,
            anonymous_limit: defaults.anonymous_limit,
            window_secs: defaults.window.as_secs(),
            keys: HashMap::new(),
        }
    }
}

impl RateLimitSection {
    pub fn policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            anonymous_limit: self.anonymous_limit,
            window: Duration::from_secs(self.window_secs.max(1)),
            keys: self.keys.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default tracing filter directive; `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_toml_str(&text)?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.tonlib.request_timeout_ms)
    }

    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_address: self.server.bind_address,
            base_path: self.server.base_path.clone(),
            json_rpc_path: self.server.json_rpc_path.clone(),
            enable_json_rpc: self.api.json_rpc,
            enable_cors: self.server.cors,
            max_body_size: self.server.max_body_size,
            request_timeout: self.request_timeout(),
        }
    }

    /// Read and parse the liteserver config. A failure here must abort
    /// startup.
    pub fn load_liteserver_config(&self) -> Result<Value, SettingsError> {
        let path = &self.tonlib.liteserver_config;
        let invalid = |reason: String| SettingsError::LiteserverConfig {
            path: path.clone(),
            reason,
        };

        let text = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let config: Value = serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;
        if !config.is_object() {
            return Err(invalid("expected a JSON object".to_string()));
        }
        Ok(config)
    }

    /// Create the keystore directory when it does not exist yet
    pub fn prepare_keystore(&self) -> Result<PathBuf, SettingsError> {
        let path = &self.tonlib.keystore;
        if !path.exists() {
            fs::create_dir_all(path).map_err(|source| SettingsError::Keystore {
                path: path.clone(),
                source,
            })?;
            info!("Created keystore directory {}", path.display());
        }
        Ok(path.clone())
    }
}
