//! Built-in middleware
//!
//! Both are constructed with the set of registered method names and ignore
//! requests for anything else.

pub mod access_log;
pub mod rate_limit;

pub use access_log::AccessLogMiddleware;
pub use rate_limit::{RateLimitMiddleware, RateLimitPolicy};
