//! Request context shared by every middleware layer

use std::fmt;
use std::net::SocketAddr;

use serde_json::{Map, Value};
use tokio::time::Instant;

/// Entry point a request arrived through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Rest,
    JsonRpc,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Rest => "rest",
            Transport::JsonRpc => "jsonrpc",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized request context across both transports
///
/// # Examples
///
/// ```rust
/// use ton_http_api_server::middleware::{RequestContext, Transport};
/// use serde_json::json;
///
/// let mut ctx = RequestContext::new("getAddressState", Transport::Rest);
/// ctx.add_metadata("user-agent", json!("curl/8.5"));
///
/// assert_eq!(ctx.method(), "getAddressState");
/// assert_eq!(ctx.metadata().get("user-agent").unwrap(), "curl/8.5");
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: String,
    transport: Transport,
    api_key: Option<String>,
    peer: Option<SocketAddr>,
    started: Instant,
    metadata: Map<String, Value>,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, transport: Transport) -> Self {
        Self {
            method: method.into(),
            transport,
            api_key: None,
            peer: None,
            started: Instant::now(),
            metadata: Map::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_peer(mut self, peer: Option<SocketAddr>) -> Self {
        self.peer = peer;
        self
    }

    /// Business method name (route name on REST, `method` on JSON-RPC).
    /// Empty when a JSON-RPC body could not be parsed.
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }
}
