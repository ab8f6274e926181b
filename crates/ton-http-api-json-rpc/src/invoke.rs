use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::envelope::ResponseEnvelope;
use crate::error::GatewayError;

/// Default per-request deadline
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs business futures under a single, globally configured deadline and
/// wraps successful results in the response envelope.
///
/// When the deadline expires the future is dropped, which cancels whatever
/// call into the client it was awaiting. Domain errors are returned unchanged
/// for the caller to map. Every call is a single attempt.
#[derive(Debug, Clone, Copy)]
pub struct Invoker {
    deadline: Duration,
}

impl Invoker {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub async fn invoke<F>(&self, future: F) -> Result<ResponseEnvelope, GatewayError>
    where
        F: Future<Output = Result<Value, GatewayError>>,
    {
        match tokio::time::timeout(self.deadline, future).await {
            Ok(Ok(result)) => Ok(ResponseEnvelope::success(result)),
            Ok(Err(err)) => {
                debug!("Business call failed: {:?}", err);
                Err(err)
            }
            Err(_) => {
                warn!("Business call exceeded deadline of {:?}", self.deadline);
                Err(GatewayError::Timeout)
            }
        }
    }
}

impl Default for Invoker {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_success_is_enveloped() {
        let invoker = Invoker::default();
        let envelope = invoker.invoke(async { Ok(json!("active")) }).await.unwrap();

        assert_eq!(envelope.result, Some(json!("active")));
        assert_eq!(envelope.error, None);
        assert_eq!(envelope.code, None);
        assert_eq!(to_value(&envelope).unwrap(), json!({"ok": true, "result": "active"}));
    }

    #[tokio::test]
    async fn test_domain_error_propagates_unchanged() {
        let invoker = Invoker::default();
        let err = invoker
            .invoke(async { Err(GatewayError::wrong_result("exit code 13")) })
            .await
            .unwrap_err();

        assert_eq!(err, GatewayError::WrongResult("exit code 13".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cancels_pending_call() {
        let invoker = Invoker::new(Duration::from_millis(250));
        let dropped = Arc::new(AtomicBool::new(false));
        let guard = DropFlag(dropped.clone());

        let started = tokio::time::Instant::now();
        let err = invoker
            .invoke(async move {
                let _guard = guard;
                std::future::pending::<()>().await;
                Ok(Value::Null)
            })
            .await
            .unwrap_err();

        assert_eq!(err, GatewayError::Timeout);
        assert!(started.elapsed() >= Duration::from_millis(250));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(dropped.load(Ordering::SeqCst), "pending call must be dropped");

        let envelope = err.to_envelope();
        assert_eq!(
            to_value(&envelope).unwrap(),
            json!({"ok": false, "error": "Liteserver timeout", "code": 504})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_just_before_deadline() {
        let invoker = Invoker::new(Duration::from_secs(1));
        let envelope = invoker
            .invoke(async {
                tokio::time::sleep(Duration::from_millis(999)).await;
                Ok(json!(1))
            })
            .await
            .unwrap();

        assert!(envelope.ok);
    }
}
