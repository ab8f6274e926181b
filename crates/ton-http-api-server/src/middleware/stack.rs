//! Middleware stack execution

use std::sync::Arc;

use ton_http_api_json_rpc::DispatchOutcome;

use super::{ApiMiddleware, MiddlewareError, RequestContext};

/// Ordered collection of middleware.
///
/// Before-hooks run in registration order and the first error stops the
/// chain. After-hooks run in reverse registration order.
#[derive(Default, Clone)]
pub struct MiddlewareStack {
    middleware: Vec<Arc<dyn ApiMiddleware>>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: Arc<dyn ApiMiddleware>) {
        self.middleware.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    pub async fn execute_before(&self, ctx: &mut RequestContext) -> Result<(), MiddlewareError> {
        for middleware in &self.middleware {
            middleware.before_dispatch(ctx).await?;
        }
        Ok(())
    }

    pub async fn execute_after(&self, ctx: &RequestContext, outcome: &DispatchOutcome) {
        for middleware in self.middleware.iter().rev() {
            middleware.after_dispatch(ctx, outcome).await;
        }
    }
}
