//! Middleware system shared by the REST and JSON-RPC entry points
//!
//! - [`ApiMiddleware`]: hook trait
//! - [`RequestContext`]: normalized request data (method, transport, API key, peer)
//! - [`MiddlewareStack`]: ordered execution
//! - [`builtins`]: access logging and API-key rate limiting

pub mod builtins;
pub mod context;
pub mod error;
pub mod stack;
pub mod traits;

pub use context::{RequestContext, Transport};
pub use error::MiddlewareError;
pub use stack::MiddlewareStack;
pub use traits::ApiMiddleware;
