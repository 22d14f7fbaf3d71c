use std::future::Future;
use std::time::Duration;

use rand::Rng;

use super::client::{ModelError, ModelResult};
use crate::config::ModelConfig;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Per-call timeout plus bounded exponential backoff for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub call_timeout: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_retries: u32, base_delay: Duration, call_timeout: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            call_timeout,
        }
    }

    #[must_use]
    pub const fn from_config(config: &ModelConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    /// Delay before retry number `attempt` (zero-based): `base * 2^attempt`
    /// plus up to half of `base` in jitter, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_BACKOFF);

        let jitter_ceiling = u64::try_from(self.base_delay.as_millis() / 2).unwrap_or(u64::MAX);
        let jitter = if jitter_ceiling == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_ceiling)
        };

        exponential + Duration::from_millis(jitter)
    }

    /// Run `call` under the timeout, retrying transient failures.
    pub async fn run<F, Fut>(&self, mut call: F) -> ModelResult<String>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ModelResult<String>>,
    {
        let mut attempt = 0u32;

        loop {
            let result = tokio::time::timeout(self.call_timeout, call())
                .await
                .unwrap_or(Err(ModelError::Timeout(self.call_timeout)));

            match result {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "transient model failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ModelConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(100), Duration::from_secs(5))
    }

    #[test]
    fn test_backoff_grows_and_is_capped() {
        let policy = policy(5);
        for attempt in 0..4 {
            let delay = policy.backoff(attempt);
            let floor = Duration::from_millis(100 * 2u64.pow(attempt));
            assert!(delay >= floor && delay <= floor + Duration::from_millis(50));
        }
        assert!(policy.backoff(30) <= MAX_BACKOFF + Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = policy(2)
            .run(|| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(ModelError::from_status(503, "busy"))
                    } else {
                        Ok("{}".to_string())
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "{}");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = policy(2)
            .run(|| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(ModelError::RateLimited) }
            })
            .await;

        assert!(matches!(result, Err(ModelError::RateLimited)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = policy(2)
            .run(|| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(ModelError::from_status(401, "invalid key")) }
            })
            .await;

        assert!(matches!(result, Err(ModelError::Client { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let result = RetryPolicy::new(0, Duration::from_millis(10), Duration::from_secs(1))
            .run(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(String::new())
            })
            .await;

        assert!(matches!(result, Err(ModelError::Timeout(d)) if d == Duration::from_secs(1)));
    }
}
