use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::middleware::{ApiMiddleware, MiddlewareError, RequestContext};

/// Limits applied by [`RateLimitMiddleware`]
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    /// Requests per window for callers without an API key
    pub anonymous_limit: u32,
    pub window: Duration,
    /// Known API keys and their requests per window
    pub keys: HashMap<String, u32>,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            anonymous_limit: 1,
            window: Duration::from_secs(1),
            keys: HashMap::new(),
        }
    }
}

#[derive(Debug)]
struct Window {
    opened: Instant,
    count: u32,
}

#[derive(Debug)]
struct Windows {
    buckets: HashMap<String, Window>,
    last_sweep: Instant,
}

impl Windows {
    /// Drop every bucket whose window has expired, at most once per window
    fn sweep(&mut self, now: Instant, window: Duration) {
        if now - self.last_sweep < window {
            return;
        }
        let before = self.buckets.len();
        self.buckets.retain(|_, w| now - w.opened < window);
        self.last_sweep = now;
        if self.buckets.len() < before {
            debug!("Evicted {} expired rate limit windows", before - self.buckets.len());
        }
    }
}

/// Fixed-window request counter per API key, or per peer address for
/// anonymous callers. Counters live in memory only and expired windows are
/// evicted as traffic arrives.
pub struct RateLimitMiddleware {
    endpoints: HashSet<String>,
    policy: RateLimitPolicy,
    windows: Mutex<Windows>,
}

impl RateLimitMiddleware {
    pub fn new<I, S>(endpoints: I, policy: RateLimitPolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            policy,
            windows: Mutex::new(Windows {
                buckets: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Number of buckets currently held in memory
    pub fn tracked_windows(&self) -> usize {
        self.windows.lock().buckets.len()
    }

    fn bucket(&self, ctx: &RequestContext) -> Result<(String, u32), MiddlewareError> {
        match ctx.api_key() {
            Some(key) => match self.policy.keys.get(key) {
                Some(limit) => Ok((format!("key:{key}"), *limit)),
                None => Err(MiddlewareError::unauthorized("API key does not exist")),
            },
            None => {
                let peer = ctx
                    .peer()
                    .map(|p| p.ip().to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                Ok((format!("peer:{peer}"), self.policy.anonymous_limit))
            }
        }
    }

    fn retry_after(&self, opened: Instant, now: Instant) -> u64 {
        let remaining = self.policy.window.saturating_sub(now - opened);
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }
}

#[async_trait]
impl ApiMiddleware for RateLimitMiddleware {
    async fn before_dispatch(&self, ctx: &mut RequestContext) -> Result<(), MiddlewareError> {
        if !self.endpoints.contains(ctx.method()) {
            return Ok(());
        }

        let (bucket, limit) = self.bucket(ctx)?;
        let now = Instant::now();

        let mut windows = self.windows.lock();
        windows.sweep(now, self.policy.window);
        let window = windows.buckets.entry(bucket.clone()).or_insert(Window {
            opened: now,
            count: 0,
        });
        if now - window.opened >= self.policy.window {
            window.opened = now;
            window.count = 0;
        }

        if window.count >= limit {
            let retry_after = self.retry_after(window.opened, now);
            warn!(
                "Rate limit exceeded for {}: {} >= {}",
                bucket, window.count, limit
            );
            return Err(MiddlewareError::rate_limit(
                format!(
                    "Ratelimit exceeded: {} requests per {:?}",
                    limit, self.policy.window
                ),
                Some(retry_after),
            ));
        }

        window.count += 1;
        debug!("{} request count: {}/{}", bucket, window.count, limit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Transport;
    use std::net::SocketAddr;

    fn policy() -> RateLimitPolicy {
        RateLimitPolicy {
            anonymous_limit: 2,
            window: Duration::from_secs(10),
            keys: HashMap::from([("secret".to_string(), 3)]),
        }
    }

    fn ctx(api_key: Option<&str>, peer: &str) -> RequestContext {
        let peer: SocketAddr = peer.parse().unwrap();
        RequestContext::new("getAddressState", Transport::Rest)
            .with_api_key(api_key.map(str::to_string))
            .with_peer(Some(peer))
    }

    #[tokio::test(start_paused = true)]
    async fn test_anonymous_limit_and_window_reset() {
        let limiter = RateLimitMiddleware::new(["getAddressState"], policy());

        for _ in 0..2 {
            limiter.before_dispatch(&mut ctx(None, "10.0.0.1:5000")).await.unwrap();
        }
        let err = limiter
            .before_dispatch(&mut ctx(None, "10.0.0.1:5001"))
            .await
            .unwrap_err();
        assert_eq!(err.retry_after(), Some(10));
        assert_eq!(err.to_gateway_error().status_code(), 429);

        // other peers have their own window
        limiter.before_dispatch(&mut ctx(None, "10.0.0.2:5000")).await.unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        limiter.before_dispatch(&mut ctx(None, "10.0.0.1:5000")).await.unwrap();
    }

    #[tokio::test]
    async fn test_known_key_uses_its_own_limit() {
        let limiter = RateLimitMiddleware::new(["getAddressState"], policy());

        for _ in 0..3 {
            limiter
                .before_dispatch(&mut ctx(Some("secret"), "10.0.0.1:5000"))
                .await
                .unwrap();
        }
        assert!(
            limiter
                .before_dispatch(&mut ctx(Some("secret"), "10.0.0.9:5000"))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_unknown_key_is_unauthorized() {
        let limiter = RateLimitMiddleware::new(["getAddressState"], policy());
        let err = limiter
            .before_dispatch(&mut ctx(Some("guess"), "10.0.0.1:5000"))
            .await
            .unwrap_err();

        assert_eq!(err, MiddlewareError::unauthorized("API key does not exist"));
        assert_eq!(err.to_gateway_error().status_code(), 401);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_windows_are_evicted() {
        let limiter = RateLimitMiddleware::new(["getAddressState"], policy());

        for i in 0..1000 {
            let peer = format!("10.{}.{}.1:5000", i / 256, i % 256);
            limiter.before_dispatch(&mut ctx(None, &peer)).await.unwrap();
        }
        assert_eq!(limiter.tracked_windows(), 1000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        limiter.before_dispatch(&mut ctx(None, "10.200.0.1:5000")).await.unwrap();
        assert_eq!(limiter.tracked_windows(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_windows_survive_sweep() {
        let limiter = RateLimitMiddleware::new(["getAddressState"], policy());
        limiter.before_dispatch(&mut ctx(None, "10.0.0.1:5000")).await.unwrap();

        tokio::time::advance(Duration::from_secs(8)).await;
        limiter.before_dispatch(&mut ctx(None, "10.0.0.2:5000")).await.unwrap();
        limiter.before_dispatch(&mut ctx(None, "10.0.0.2:5000")).await.unwrap();

        // sweep runs, first peer expires, second peer keeps its exhausted count
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(limiter.before_dispatch(&mut ctx(None, "10.0.0.2:5000")).await.is_err());
        assert_eq!(limiter.tracked_windows(), 1);
    }

    #[tokio::test]
    async fn test_sub_second_window_in_message() {
        let limiter = RateLimitMiddleware::new(
            ["getAddressState"],
            RateLimitPolicy {
                anonymous_limit: 1,
                window: Duration::from_millis(500),
                keys: HashMap::new(),
            },
        );
        limiter.before_dispatch(&mut ctx(None, "10.0.0.1:5000")).await.unwrap();
        let err = limiter
            .before_dispatch(&mut ctx(None, "10.0.0.1:5000"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Ratelimit exceeded: 1 requests per 500ms");
        assert_eq!(err.retry_after(), Some(1));
    }

    #[tokio::test]
    async fn test_unregistered_methods_are_not_counted() {
        let limiter = RateLimitMiddleware::new(["getAddressState"], policy());
        for _ in 0..5 {
            let mut ctx = RequestContext::new("doesNotExist", Transport::JsonRpc);
            limiter.before_dispatch(&mut ctx).await.unwrap();
        }
    }
}
