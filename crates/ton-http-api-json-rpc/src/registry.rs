use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::GatewayError;
use crate::params::{MethodParams, ParameterDescriptor};

/// Type-erased business method.
///
/// Implementations bind the argument map to their parameter struct, run the
/// business logic and serialize the domain value. They never build envelopes.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn call(&self, args: Map<String, Value>) -> Result<Value, GatewayError>;
}

/// Handler built from an async function over a typed parameter struct
pub struct FnHandler<P, F> {
    handler_fn: F,
    _params: PhantomData<fn() -> P>,
}

impl<P, F> FnHandler<P, F> {
    pub fn new(handler_fn: F) -> Self {
        Self {
            handler_fn,
            _params: PhantomData,
        }
    }
}

#[async_trait]
impl<P, F, Fut, R> MethodHandler for FnHandler<P, F>
where
    P: MethodParams,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, GatewayError>> + Send + 'static,
    R: Serialize + Send + 'static,
{
    async fn call(&self, args: Map<String, Value>) -> Result<Value, GatewayError> {
        let params: P =
            serde_json::from_value(Value::Object(args)).map_err(GatewayError::validation)?;
        let result = (self.handler_fn)(params).await?;
        serde_json::to_value(result).map_err(GatewayError::internal)
    }
}

/// A business method together with its parameter descriptor
#[derive(Clone)]
pub struct RegisteredMethod {
    name: String,
    descriptor: Arc<ParameterDescriptor>,
    handler: Arc<dyn MethodHandler>,
}

impl RegisteredMethod {
    pub fn new(
        name: impl Into<String>,
        descriptor: ParameterDescriptor,
        handler: Arc<dyn MethodHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            descriptor: Arc::new(descriptor),
            handler,
        }
    }

    /// Build a method from an async function; the descriptor comes from `P`
    pub fn from_fn<P, F, Fut, R>(name: impl Into<String>, handler_fn: F) -> Self
    where
        P: MethodParams,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, GatewayError>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        Self::new(name, P::descriptor(), Arc::new(FnHandler::new(handler_fn)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &ParameterDescriptor {
        &self.descriptor
    }

    pub fn handler(&self) -> &Arc<dyn MethodHandler> {
        &self.handler
    }

    pub async fn call(&self, args: Map<String, Value>) -> Result<Value, GatewayError> {
        self.handler.call(args).await
    }
}

impl std::fmt::Debug for RegisteredMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredMethod")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Startup-phase registry. Populate it, then [`freeze`](Self::freeze) it
/// before serving.
#[derive(Default)]
pub struct RegistryBuilder {
    methods: HashMap<String, RegisteredMethod>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `method` under its name. A second registration under the same
    /// name replaces the first.
    pub fn register(&mut self, method: RegisteredMethod) -> &mut Self {
        let name = method.name().to_string();
        if self.methods.insert(name.clone(), method).is_some() {
            warn!("Method '{}' registered twice, keeping the latest handler", name);
        }
        self
    }

    /// Convenience wrapper around [`RegisteredMethod::from_fn`]
    pub fn register_fn<P, F, Fut, R>(&mut self, name: impl Into<String>, handler_fn: F) -> &mut Self
    where
        P: MethodParams,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, GatewayError>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        self.register(RegisteredMethod::from_fn(name, handler_fn))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Names registered so far, sorted
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// End the registration phase
    pub fn freeze(self) -> Arc<MethodRegistry> {
        Arc::new(MethodRegistry {
            methods: self.methods,
        })
    }
}

/// Read-only mapping from method name to registered method, shared for the
/// serving lifetime.
#[derive(Debug, Default)]
pub struct MethodRegistry {
    methods: HashMap<String, RegisteredMethod>,
}

impl MethodRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Pure lookup. `None` is the not-found outcome.
    pub fn resolve(&self, name: &str) -> Option<&RegisteredMethod> {
        self.methods.get(name)
    }

    /// All registered method names, sorted
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
