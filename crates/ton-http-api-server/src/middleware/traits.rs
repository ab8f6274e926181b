//! Core middleware trait definitions

use async_trait::async_trait;
use ton_http_api_json_rpc::DispatchOutcome;

use super::{MiddlewareError, RequestContext};

/// Intercepts requests on both transports around method dispatch.
///
/// # Lifecycle
///
/// 1. **Before dispatch**: runs once the method name is known, before
///    argument binding. Unparseable JSON-RPC bodies pass through here too,
///    with an empty method name. Returning an error short-circuits the
///    request; the error is enveloped and the method is never invoked.
/// 2. **After dispatch**: sees the final status and envelope. Runs for
///    short-circuited requests too.
///
/// # Examples
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use ton_http_api_server::middleware::{ApiMiddleware, MiddlewareError, RequestContext};
///
/// struct RequireKey;
///
/// #[async_trait]
/// impl ApiMiddleware for RequireKey {
///     async fn before_dispatch(&self, ctx: &mut RequestContext) -> Result<(), MiddlewareError> {
///         ctx.api_key()
///             .map(|_| ())
///             .ok_or_else(|| MiddlewareError::unauthorized("API key required"))
///     }
/// }
/// ```
#[async_trait]
pub trait ApiMiddleware: Send + Sync {
    async fn before_dispatch(&self, ctx: &mut RequestContext) -> Result<(), MiddlewareError>;

    #[allow(unused_variables)]
    async fn after_dispatch(&self, ctx: &RequestContext, outcome: &DispatchOutcome) {}
}
