//! # TON HTTP API server
//!
//! hyper-based HTTP transport for the gateway. Every business method
//! registered on the builder is reachable twice:
//!
//! - as a REST route `<base>/<method>` (GET with query parameters, or POST
//!   with a JSON body), bound by [`router`] without JSON-RPC normalization
//! - through the single JSON-RPC endpoint `<base>/jsonRPC`, dispatched by
//!   [`ton_http_api_json_rpc::JsonRpcDispatcher`]
//!
//! Both paths share the same deadline, error mapping and [`middleware`].

pub mod cors;
pub mod middleware;
pub mod response;
pub mod router;
pub mod server;

#[cfg(test)]
mod tests;

pub use cors::CorsLayer;
pub use middleware::builtins::{AccessLogMiddleware, RateLimitMiddleware, RateLimitPolicy};
pub use middleware::{ApiMiddleware, MiddlewareError, MiddlewareStack, RequestContext, Transport};
pub use router::{Binding, RestRoute, RestRouter};
pub use server::{HttpApiServer, HttpApiServerBuilder, ServerConfig};

pub use ton_http_api_json_rpc as json_rpc;

/// Result type for HTTP API server operations
pub type Result<T> = std::result::Result<T, HttpApiError>;

/// Transport-level failures (not request failures, which are enveloped)
#[derive(Debug, thiserror::Error)]
pub enum HttpApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
