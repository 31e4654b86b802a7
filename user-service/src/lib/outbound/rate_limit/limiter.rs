use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Counter value after an increment, together with the remaining window.
#[derive(Debug, Clone, Copy)]
pub struct WindowCount {
    pub count: i64,
    pub ttl_seconds: i64,
}

/// Atomic fixed-window counter.
///
/// `increment` must bump the counter for `key`, start the window (set the
/// TTL) when the counter is created, and report the remaining TTL, all as
/// one atomic operation. The Redis implementation does this with a Lua
/// script.
#[async_trait]
pub trait CounterStore: Send + Sync + 'static {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, anyhow::Error>;
}

/// How many requests a single (path, IP) pair may make per window.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn per_hour(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded, retry in {retry_after_seconds}s")]
    Limited { retry_after_seconds: i64 },

    #[error("Counter store error: {0}")]
    Store(String),
}

/// Fixed-window per-IP rate limiter.
///
/// Counters are keyed by (path, client IP) so limits on one endpoint do
/// not consume the budget of another. Keys expire with the window, so an
/// idle pair costs nothing.
pub struct IpRateLimiter<S: CounterStore> {
    store: Arc<S>,
    enabled: bool,
}

impl<S: CounterStore> IpRateLimiter<S> {
    pub fn new(store: Arc<S>, enabled: bool) -> Self {
        Self { store, enabled }
    }

    /// Count a request against the window and decide whether it may
    /// proceed.
    ///
    /// # Errors
    /// * `Limited` - Budget exhausted; carries seconds until the window resets
    /// * `Store` - Counter store unavailable
    pub async fn check(
        &self,
        path: &str,
        client_ip: IpAddr,
        policy: RateLimitPolicy,
    ) -> Result<(), RateLimitError> {
        if !self.enabled {
            return Ok(());
        }

        let key = format!("rate_limit:path:ip:{}:{}", path, client_ip);
        let window = self
            .store
            .increment(&key, policy.window)
            .await
            .map_err(|e| RateLimitError::Store(e.to_string()))?;

        if window.count > policy.max_requests as i64 {
            tracing::warn!(
                path,
                %client_ip,
                count = window.count,
                "Rate limit exceeded"
            );
            return Err(RateLimitError::Limited {
                // TTL can read -1 if the key somehow lost its expiry;
                // fall back to the full window rather than a negative hint
                retry_after_seconds: if window.ttl_seconds > 0 {
                    window.ttl_seconds
                } else {
                    policy.window.as_secs() as i64
                },
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Instant;

    use tokio::sync::Mutex;

    use super::*;

    struct InMemoryCounterStore {
        counters: Mutex<HashMap<String, (i64, Instant)>>,
    }

    impl InMemoryCounterStore {
        fn new() -> Self {
            Self {
                counters: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl CounterStore for InMemoryCounterStore {
        async fn increment(
            &self,
            key: &str,
            window: Duration,
        ) -> Result<WindowCount, anyhow::Error> {
            let mut counters = self.counters.lock().await;
            let now = Instant::now();

            let entry = counters
                .entry(key.to_string())
                .and_modify(|(count, deadline)| {
                    if *deadline <= now {
                        *count = 0;
                        *deadline = now + window;
                    }
                    *count += 1;
                })
                .or_insert((1, now + window));

            Ok(WindowCount {
                count: entry.0,
                ttl_seconds: entry.1.saturating_duration_since(now).as_secs() as i64,
            })
        }
    }

    fn limiter(enabled: bool) -> IpRateLimiter<InMemoryCounterStore> {
        IpRateLimiter::new(Arc::new(InMemoryCounterStore::new()), enabled)
    }

    fn ip() -> IpAddr {
        "203.0.113.7".parse().unwrap()
    }

    #[tokio::test]
    async fn test_requests_within_budget_pass() {
        let limiter = limiter(true);
        let policy = RateLimitPolicy {
            max_requests: 3,
            window: Duration::from_secs(60),
        };

        for _ in 0..3 {
            assert!(limiter.check("/register", ip(), policy).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_fourth_request_is_denied_with_retry_hint() {
        let limiter = limiter(true);
        let policy = RateLimitPolicy {
            max_requests: 3,
            window: Duration::from_secs(60),
        };

        for _ in 0..3 {
            limiter.check("/register", ip(), policy).await.unwrap();
        }
        let denied = limiter.check("/register", ip(), policy).await;

        match denied {
            Err(RateLimitError::Limited {
                retry_after_seconds,
            }) => {
                assert!(retry_after_seconds > 0 && retry_after_seconds <= 60);
            }
            other => panic!("expected Limited, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_new_window_restarts_count() {
        let limiter = limiter(true);
        let policy = RateLimitPolicy {
            max_requests: 1,
            window: Duration::from_millis(50),
        };

        limiter.check("/login", ip(), policy).await.unwrap();
        assert!(limiter.check("/login", ip(), policy).await.is_err());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(limiter.check("/login", ip(), policy).await.is_ok());
    }

    #[tokio::test]
    async fn test_paths_have_independent_budgets() {
        let limiter = limiter(true);
        let policy = RateLimitPolicy {
            max_requests: 1,
            window: Duration::from_secs(60),
        };

        limiter.check("/register", ip(), policy).await.unwrap();
        assert!(limiter.check("/register", ip(), policy).await.is_err());
        assert!(limiter.check("/login", ip(), policy).await.is_ok());
    }

    #[tokio::test]
    async fn test_ips_have_independent_budgets() {
        let limiter = limiter(true);
        let policy = RateLimitPolicy {
            max_requests: 1,
            window: Duration::from_secs(60),
        };

        limiter.check("/register", ip(), policy).await.unwrap();
        assert!(limiter
            .check("/register", "203.0.113.8".parse().unwrap(), policy)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_disabled_limiter_always_passes() {
        let limiter = limiter(false);
        let policy = RateLimitPolicy {
            max_requests: 1,
            window: Duration::from_secs(60),
        };

        for _ in 0..10 {
            assert!(limiter.check("/register", ip(), policy).await.is_ok());
        }
    }
}
