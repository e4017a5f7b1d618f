//! Retry executor with bounded exponential backoff and jitter.
//!
//! Wraps a single provider target. Errors are classified through
//! [`ProviderError::is_retryable`]: transient failures (429/5xx, connect
//! errors, timeouts, transient vocabulary) sleep and try again up to the
//! configured attempt budget; fatal errors abort immediately without
//! sleeping. The executor knows nothing about users, quotas, or fallback —
//! the router layers those on top.

use std::future::Future;

use tracing::{debug, warn};

use crate::{
    config::RetryConfig,
    providers::{ProviderError, ProviderId},
};

/// Execute a provider call with retry.
///
/// `make_request` is invoked once per attempt. Returns the first success,
/// or the last error once attempts are exhausted or a fatal error occurs.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    provider: ProviderId,
    operation: &str,
    make_request: F,
) -> Result<T, ProviderError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let max_attempts = config.max_attempts.max(1);

    for attempt in 0..max_attempts {
        match make_request().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(
                        provider = %provider,
                        operation,
                        attempt = attempt + 1,
                        "Request succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(error) => {
                if error.is_retryable() && attempt < max_attempts - 1 {
                    let delay = config.delay_for_attempt(attempt);
                    warn!(
                        provider = %provider,
                        operation,
                        error = %error,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis(),
                        "Retryable provider error, will retry after delay"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }

                if attempt > 0 {
                    warn!(
                        provider = %provider,
                        operation,
                        error = %error,
                        attempts = attempt + 1,
                        "Provider request failed after all retry attempts"
                    );
                }
                return Err(error);
            }
        }
    }

    unreachable!("retry loop should have returned")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay_ms: 5,
            max_delay_ms: 20,
            jitter: 0.0,
        }
    }

    fn transient() -> ProviderError {
        ProviderError::Http {
            status: 503,
            message: "service unavailable".into(),
        }
    }

    fn fatal() -> ProviderError {
        ProviderError::Http {
            status: 400,
            message: "invalid request".into(),
        }
    }

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let attempts = AtomicU32::new(0);
        let result = with_retry(&fast_config(3), ProviderId::OpenAi, "parse", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ProviderError>(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let attempts = AtomicU32::new(0);
        let result = with_retry(&fast_config(3), ProviderId::Gemini, "parse", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient())
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let attempts = AtomicU32::new(0);
        let result: Result<i32, _> =
            with_retry(&fast_config(3), ProviderId::Gemini, "summarize", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            })
            .await;

        assert!(matches!(
            result,
            Err(ProviderError::Http { status: 503, .. })
        ));
        // max_attempts is the total attempt budget, not the retry count.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_aborts_without_sleeping() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 3,
            base_delay_ms: 60_000,
            max_delay_ms: 60_000,
            jitter: 0.0,
        };

        let start = std::time::Instant::now();
        let result: Result<i32, _> = with_retry(&config, ProviderId::OpenAi, "enhance", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(fatal()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        // A fatal error must not consume a backoff sleep.
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_single_attempt_budget() {
        let attempts = AtomicU32::new(0);
        let result: Result<i32, _> =
            with_retry(&fast_config(1), ProviderId::OpenAi, "match", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
