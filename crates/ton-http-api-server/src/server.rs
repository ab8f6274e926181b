//! HTTP server exposing every registered method twice: as a REST route and
//! through the single JSON-RPC endpoint.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body::Body;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use ton_http_api_json_rpc::{
    DispatchOutcome, GatewayError, Invoker, JsonRpcDispatcher, MethodParams, MethodRegistry,
    RegisteredMethod, RegistryBuilder, RequestEnvelope, invoke_method, status_codes,
};

use crate::middleware::{ApiMiddleware, MiddlewareError, MiddlewareStack, RequestContext, Transport};
use crate::response::{envelope_response, preflight_response, with_retry_after};
use crate::router::{Binding, RestRoute, RestRouter, bind_json_body, bind_query};
use crate::{CorsLayer, Result};

/// Header carrying the caller's API key
pub const API_KEY_HEADER: &str = "X-API-Key";
/// Query parameter carrying the caller's API key
pub const API_KEY_QUERY: &str = "api_key";

/// Configuration for the HTTP API server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,
    /// Prefix of every route, e.g. `/api/v2`
    pub base_path: String,
    /// JSON-RPC endpoint path, relative to `base_path`
    pub json_rpc_path: String,
    pub enable_json_rpc: bool,
    pub enable_cors: bool,
    pub max_body_size: usize,
    /// Deadline applied to every business call
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8081)),
            base_path: "/api/v2".to_string(),
            json_rpc_path: "/jsonRPC".to_string(),
            enable_json_rpc: true,
            enable_cors: true,
            max_body_size: 1024 * 1024, // 1MB
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Builder for [`HttpApiServer`]. Registration only happens here; the built
/// server never changes its method table.
pub struct HttpApiServerBuilder {
    config: ServerConfig,
    registry: RegistryBuilder,
    router: RestRouter,
    middleware: MiddlewareStack,
}

impl HttpApiServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            registry: RegistryBuilder::new(),
            router: RestRouter::new(),
            middleware: MiddlewareStack::new(),
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    pub fn base_path(mut self, path: impl Into<String>) -> Self {
        self.config.base_path = path.into();
        self
    }

    pub fn json_rpc_path(mut self, path: impl Into<String>) -> Self {
        self.config.json_rpc_path = path.into();
        self
    }

    /// Enable or disable the JSON-RPC endpoint
    pub fn json_rpc(mut self, enable: bool) -> Self {
        self.config.enable_json_rpc = enable;
        self
    }

    pub fn cors(mut self, enable: bool) -> Self {
        self.config.enable_cors = enable;
        self
    }

    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Register `method` for JSON-RPC and at `/<name>` with the given verb.
    /// Registering a name again replaces both bindings.
    pub fn route(mut self, verb: Method, binding: Binding, method: RegisteredMethod) -> Self {
        let name = method.name().to_string();
        self.router.remove_method(&name);
        self.router.insert(
            format!("/{name}"),
            RestRoute {
                method_name: name,
                verb,
                binding,
            },
        );
        self.registry.register(method);
        self
    }

    /// Register a method bound from the query string of a GET request
    pub fn get<P, F, Fut, R>(self, name: impl Into<String>, handler_fn: F) -> Self
    where
        P: MethodParams,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, GatewayError>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        self.route(
            Method::GET,
            Binding::Query,
            RegisteredMethod::from_fn(name, handler_fn),
        )
    }

    /// Register a method bound from the JSON body of a POST request
    pub fn post<P, F, Fut, R>(self, name: impl Into<String>, handler_fn: F) -> Self
    where
        P: MethodParams,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, GatewayError>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        self.route(
            Method::POST,
            Binding::JsonBody,
            RegisteredMethod::from_fn(name, handler_fn),
        )
    }

    pub fn middleware(mut self, middleware: Arc<dyn ApiMiddleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Names of the methods registered so far
    pub fn method_names(&self) -> Vec<String> {
        self.registry.method_names()
    }

    pub fn build(self) -> HttpApiServer {
        let registry = self.registry.freeze();
        let dispatcher = JsonRpcDispatcher::new(registry, Invoker::new(self.config.request_timeout));

        HttpApiServer {
            config: Arc::new(self.config),
            dispatcher: Arc::new(dispatcher),
            router: Arc::new(self.router),
            middleware: self.middleware,
        }
    }
}

impl Default for HttpApiServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The gateway's HTTP front end
#[derive(Clone)]
pub struct HttpApiServer {
    config: Arc<ServerConfig>,
    dispatcher: Arc<JsonRpcDispatcher>,
    router: Arc<RestRouter>,
    middleware: MiddlewareStack,
}

impl HttpApiServer {
    pub fn builder() -> HttpApiServerBuilder {
        HttpApiServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<MethodRegistry> {
        self.dispatcher.registry()
    }

    pub fn router(&self) -> &RestRouter {
        &self.router
    }

    /// Bind the configured address and serve until an accept error
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_address).await?;
        self.serve(listener).await
    }

    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("HTTP API server listening on {}", local_addr);
        info!(
            "{} REST routes under {}",
            self.router.len(),
            display_base(&self.config.base_path)
        );
        if self.config.enable_json_rpc {
            info!(
                "JSON-RPC endpoint available at: {}{}",
                self.config.base_path.trim_end_matches('/'),
                self.config.json_rpc_path
            );
        }

        loop {
            let (stream, peer_addr) = listener.accept().await?;
            debug!("New connection from {}", peer_addr);

            let server = self.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { Ok::<_, Infallible>(server.handle(req, Some(peer_addr)).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    let err_str = err.to_string();
                    if err_str.contains("connection closed before message completed") {
                        debug!("Client disconnected (normal): {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }

    /// Handle one request. Every path, failures included, ends in an
    /// envelope response.
    pub async fn handle<B>(&self, req: Request<B>, peer: Option<SocketAddr>) -> Response<Full<Bytes>>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        debug!("Handling {} {}", req.method(), req.uri().path());

        let mut response = if req.method() == Method::OPTIONS {
            preflight_response()
        } else {
            self.route_request(req, peer).await
        };

        if self.config.enable_cors {
            CorsLayer::apply_cors_headers(response.headers_mut());
        }
        response
    }

    async fn route_request<B>(&self, req: Request<B>, peer: Option<SocketAddr>) -> Response<Full<Bytes>>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let Some(local) = strip_base(&self.config.base_path, req.uri().path()).map(str::to_string)
        else {
            return error_response(&GatewayError::not_found());
        };

        if self.config.enable_json_rpc && local == self.config.json_rpc_path {
            if req.method() != Method::POST {
                return error_response(&GatewayError::method_not_allowed());
            }
            return self.handle_json_rpc(req, peer).await;
        }

        match self.router.lookup(&local) {
            None => error_response(&GatewayError::not_found()),
            Some(route) if route.verb != req.method() => {
                error_response(&GatewayError::method_not_allowed())
            }
            Some(route) => self.handle_rest(route, req, peer).await,
        }
    }

    async fn handle_rest<B>(
        &self,
        route: &RestRoute,
        req: Request<B>,
        peer: Option<SocketAddr>,
    ) -> Response<Full<Bytes>>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let mut ctx = RequestContext::new(&route.method_name, Transport::Rest)
            .with_api_key(extract_api_key(&req))
            .with_peer(peer);

        if let Err(err) = self.middleware.execute_before(&mut ctx).await {
            return self.reject(&ctx, err, None).await;
        }

        let outcome = match self.bind_rest(route, req).await {
            Ok((method, args)) => invoke_method(self.dispatcher.invoker(), method, args).await,
            Err(err) => DispatchOutcome::from_error(&err),
        };
        self.finish(&ctx, outcome).await
    }

    async fn bind_rest<B>(
        &self,
        route: &RestRoute,
        req: Request<B>,
    ) -> std::result::Result<(&RegisteredMethod, serde_json::Map<String, Value>), GatewayError>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let method = self.registry().resolve(&route.method_name).ok_or_else(|| {
            GatewayError::internal(format!(
                "route for '{}' has no registered method",
                route.method_name
            ))
        })?;

        let args = match route.binding {
            Binding::Query => bind_query(method.descriptor(), req.uri().query())?,
            Binding::JsonBody => bind_json_body(&self.read_body(req.into_body()).await?)?,
        };
        Ok((method, args))
    }

    async fn handle_json_rpc<B>(&self, req: Request<B>, peer: Option<SocketAddr>) -> Response<Full<Bytes>>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let api_key = extract_api_key(&req);
        let body = match self.read_body(req.into_body()).await {
            Ok(body) => body,
            Err(err) => return error_response(&err),
        };

        let request = match RequestEnvelope::parse(&body) {
            Ok(request) => request,
            Err(err) => {
                debug!("Rejecting JSON-RPC body: {}", err);
                // no method name to report, but the middleware chain still applies
                let mut ctx = RequestContext::new("", Transport::JsonRpc)
                    .with_api_key(api_key)
                    .with_peer(peer);
                let id = salvage_id(&body);
                if let Err(rejection) = self.middleware.execute_before(&mut ctx).await {
                    return self.reject(&ctx, rejection, id).await;
                }
                let outcome = DispatchOutcome::from_error(&GatewayError::validation(err)).with_id(id);
                return self.finish(&ctx, outcome).await;
            }
        };

        let mut ctx = RequestContext::new(&request.method, Transport::JsonRpc)
            .with_api_key(api_key)
            .with_peer(peer);

        if let Err(err) = self.middleware.execute_before(&mut ctx).await {
            return self.reject(&ctx, err, request.id).await;
        }

        let outcome = self.dispatcher.dispatch(request).await;
        self.finish(&ctx, outcome).await
    }

    async fn read_body<B>(&self, body: B) -> std::result::Result<Bytes, GatewayError>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match Limited::new(body, self.config.max_body_size).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => Err(GatewayError::http(
                status_codes::PAYLOAD_TOO_LARGE,
                "Payload Too Large",
            )),
            Err(err) => {
                debug!("Failed to read request body: {}", err);
                Err(GatewayError::malformed("Failed to read request body"))
            }
        }
    }

    async fn reject(
        &self,
        ctx: &RequestContext,
        err: MiddlewareError,
        id: Option<Value>,
    ) -> Response<Full<Bytes>> {
        warn!("Request for '{}' rejected: {}", ctx.method(), err);
        let outcome = DispatchOutcome::from_error(&err.to_gateway_error()).with_id(id);
        self.middleware.execute_after(ctx, &outcome).await;

        let response = envelope_response(&outcome);
        match err.retry_after() {
            Some(seconds) => with_retry_after(response, seconds),
            None => response,
        }
    }

    async fn finish(&self, ctx: &RequestContext, outcome: DispatchOutcome) -> Response<Full<Bytes>> {
        self.middleware.execute_after(ctx, &outcome).await;
        envelope_response(&outcome)
    }
}

fn error_response(err: &GatewayError) -> Response<Full<Bytes>> {
    envelope_response(&DispatchOutcome::from_error(err))
}

fn display_base(base: &str) -> &str {
    if base.is_empty() { "/" } else { base }
}

/// Path relative to `base`, or `None` when it lies outside of it
fn strip_base<'a>(base: &str, path: &'a str) -> Option<&'a str> {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return Some(path);
    }
    match path.strip_prefix(base) {
        Some(rest) if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

fn extract_api_key<B>(req: &Request<B>) -> Option<String> {
    if let Some(value) = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(value.to_string());
    }
    req.uri().query().and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == API_KEY_QUERY)
            .map(|(_, value)| value.into_owned())
    })
}

// Correlation id of a body that is JSON but not a valid request envelope
fn salvage_id(body: &[u8]) -> Option<Value> {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| value.get("id").cloned())
}
