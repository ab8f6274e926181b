use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use ton_http_api_json_rpc::DispatchOutcome;

use crate::middleware::{ApiMiddleware, MiddlewareError, RequestContext};

/// Logs method, transport, status and elapsed time of every request to a
/// registered endpoint. Requests for anything else are left to the debug log.
pub struct AccessLogMiddleware {
    endpoints: HashSet<String>,
}

impl AccessLogMiddleware {
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_logged(&self, method: &str) -> bool {
        self.endpoints.contains(method)
    }
}

#[async_trait]
impl ApiMiddleware for AccessLogMiddleware {
    async fn before_dispatch(&self, ctx: &mut RequestContext) -> Result<(), MiddlewareError> {
        debug!("→ {} {} starting", ctx.transport(), ctx.method());
        Ok(())
    }

    async fn after_dispatch(&self, ctx: &RequestContext, outcome: &DispatchOutcome) {
        if !self.is_logged(ctx.method()) {
            debug!(
                "← {} {} (unregistered) {}",
                ctx.transport(),
                ctx.method(),
                outcome.status
            );
            return;
        }

        let peer = ctx
            .peer()
            .map(|p| p.ip().to_string())
            .unwrap_or_else(|| "-".to_string());
        if outcome.envelope.ok {
            info!(
                "← {} {} {} {}ms peer={}",
                ctx.transport(),
                ctx.method(),
                outcome.status,
                ctx.elapsed_ms(),
                peer
            );
        } else {
            warn!(
                "← {} {} {} {}ms peer={} error={:?}",
                ctx.transport(),
                ctx.method(),
                outcome.status,
                ctx.elapsed_ms(),
                peer,
                outcome.envelope.error
            );
        }
    }
}
