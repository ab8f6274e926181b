use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::error::{GatewayError, status_codes};
use crate::invoke::Invoker;
use crate::params::normalize;
use crate::registry::{MethodRegistry, RegisteredMethod};

/// Response body and HTTP status produced for one request
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub status: u16,
    pub envelope: ResponseEnvelope,
}

impl DispatchOutcome {
    pub fn ok(envelope: ResponseEnvelope) -> Self {
        Self {
            status: status_codes::OK,
            envelope,
        }
    }

    /// Apply the error mapping; internal detail goes to the log only
    pub fn from_error(err: &GatewayError) -> Self {
        if let GatewayError::Internal(detail) = err {
            error!("Internal error: {}", detail);
        }
        Self {
            status: err.status_code(),
            envelope: err.to_envelope(),
        }
    }

    pub fn from_result(result: Result<ResponseEnvelope, GatewayError>) -> Self {
        match result {
            Ok(envelope) => Self::ok(envelope),
            Err(err) => Self::from_error(&err),
        }
    }

    pub fn with_id(mut self, id: Option<Value>) -> Self {
        self.envelope = self.envelope.with_id(id);
        self
    }
}

/// Run an already-bound argument map through the method under the invoker's
/// deadline. Shared by both transports.
pub async fn invoke_method(
    invoker: &Invoker,
    method: &RegisteredMethod,
    args: Map<String, Value>,
) -> DispatchOutcome {
    DispatchOutcome::from_result(invoker.invoke(method.call(args)).await)
}

/// Single-endpoint dispatcher: resolve, normalize, invoke, correlate
#[derive(Debug, Clone)]
pub struct JsonRpcDispatcher {
    registry: Arc<MethodRegistry>,
    invoker: Invoker,
}

impl JsonRpcDispatcher {
    pub fn new(registry: Arc<MethodRegistry>, invoker: Invoker) -> Self {
        Self { registry, invoker }
    }

    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Every outcome echoes the request `id` verbatim: an explicit null is
    /// echoed as null, an absent id stays absent.
    pub async fn dispatch(&self, request: RequestEnvelope) -> DispatchOutcome {
        let RequestEnvelope { method, params, id } = request;

        let Some(registered) = self.registry.resolve(&method) else {
            debug!("Unknown JSON-RPC method: {}", method);
            return DispatchOutcome::from_error(&GatewayError::UnknownMethod(method)).with_id(id);
        };

        let args = match normalize(&params, registered.descriptor()) {
            Ok(args) => args,
            Err(err) => {
                debug!("Normalization of '{}' failed: {}", method, err);
                return DispatchOutcome::from_error(&GatewayError::from(err)).with_id(id);
            }
        };

        invoke_method(&self.invoker, registered, args)
            .await
            .with_id(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{MethodParams, ParamKind, ParameterDescriptor};
    use serde::Deserialize;
    use serde_json::{json, to_value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Deserialize)]
    struct LtParams {
        address: String,
        #[serde(default)]
        lt: Option<u64>,
        #[serde(default = "default_limit")]
        limit: u32,
    }

    fn default_limit() -> u32 {
        10
    }

    impl MethodParams for LtParams {
        fn descriptor() -> ParameterDescriptor {
            ParameterDescriptor::new()
                .required("address", ParamKind::String)
                .nullable("lt", ParamKind::OptionalInteger)
                .optional("limit", ParamKind::OptionalInteger, 10)
        }
    }

    fn dispatcher(calls: Arc<AtomicUsize>) -> JsonRpcDispatcher {
        let mut builder = MethodRegistry::builder();
        builder.register_fn("getTransactions", move |p: LtParams| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, GatewayError>(json!({"address": p.address, "lt": p.lt, "limit": p.limit})) }
        });
        builder.register_fn("slow", |_: crate::params::NoParams| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, GatewayError>(())
        });
        builder.register_fn("broken", |_: crate::params::NoParams| async {
            Err::<(), _>(GatewayError::internal("socket closed"))
        });
        JsonRpcDispatcher::new(builder.freeze(), Invoker::new(Duration::from_secs(5)))
    }

    fn request(body: Value) -> RequestEnvelope {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_method_not_invoked() {
        let calls = Arc::new(AtomicUsize::new(0));
        let outcome = dispatcher(calls.clone())
            .dispatch(request(json!({"method": "doesNotExist", "params": {}, "id": 2})))
            .await;

        assert_eq!(outcome.status, 422);
        assert_eq!(
            to_value(&outcome.envelope).unwrap(),
            json!({"ok": false, "error": "Unknown method", "code": 422, "id": 2})
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_normalized_arguments_reach_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let outcome = dispatcher(calls.clone())
            .dispatch(request(json!({
                "method": "getTransactions",
                "params": {"address": "EQ", "lt": "47597573000001"},
                "id": "abc"
            })))
            .await;

        assert_eq!(outcome.status, 200);
        assert_eq!(
            to_value(&outcome.envelope).unwrap(),
            json!({
                "ok": true,
                "result": {"address": "EQ", "lt": 47597573000001_u64, "limit": 10},
                "id": "abc"
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_required_reported_without_invocation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let outcome = dispatcher(calls.clone())
            .dispatch(request(json!({"method": "getTransactions", "params": {}, "id": 7})))
            .await;

        assert_eq!(outcome.status, 422);
        assert_eq!(
            outcome.envelope.error.as_deref(),
            Some("MissingRequiredParameter: non-optional argument 'address' expected")
        );
        assert_eq!(outcome.envelope.id, Some(json!(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_coercion_failure_names_parameter() {
        let outcome = dispatcher(Arc::new(AtomicUsize::new(0)))
            .dispatch(request(json!({
                "method": "getTransactions",
                "params": {"address": "EQ", "limit": "ten"},
                "id": 1
            })))
            .await;

        assert_eq!(outcome.status, 422);
        assert_eq!(
            outcome.envelope.error.as_deref(),
            Some("TypeCoercionError: can't parse integer in parameter 'limit'")
        );
    }

    #[tokio::test]
    async fn test_null_and_absent_ids_are_echoed_verbatim() {
        let dispatcher = dispatcher(Arc::new(AtomicUsize::new(0)));

        let with_null = dispatcher
            .dispatch(request(json!({"method": "doesNotExist", "id": null})))
            .await;
        assert_eq!(to_value(&with_null.envelope).unwrap()["id"], Value::Null);
        assert_eq!(with_null.envelope.id, Some(Value::Null));

        let absent = dispatcher
            .dispatch(request(json!({"method": "getTransactions", "params": {"address": "EQ"}})))
            .await;
        assert_eq!(absent.envelope.id, None);
        assert!(to_value(&absent.envelope).unwrap().get("id").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_id() {
        let outcome = dispatcher(Arc::new(AtomicUsize::new(0)))
            .dispatch(request(json!({"method": "slow", "id": 3})))
            .await;

        assert_eq!(outcome.status, 504);
        assert_eq!(
            to_value(&outcome.envelope).unwrap(),
            json!({"ok": false, "error": "Liteserver timeout", "code": 504, "id": 3})
        );
    }

    #[tokio::test]
    async fn test_internal_error_is_generic() {
        let outcome = dispatcher(Arc::new(AtomicUsize::new(0)))
            .dispatch(request(json!({"method": "broken", "id": 4})))
            .await;

        assert_eq!(outcome.status, 500);
        assert_eq!(outcome.envelope.error.as_deref(), Some("Internal server error"));
    }
}
