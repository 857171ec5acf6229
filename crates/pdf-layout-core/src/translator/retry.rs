use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

use crate::error::{Error, Result};

/// Longest server-requested wait honored before a retry.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Bounded retries with linearly growing backoff.
///
/// Only timeouts and transient HTTP failures are retried; everything else
/// is returned on first occurrence.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retries: u32,
    /// Wait before the first retry; the n-th retry waits n times this
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(retries: u32, base_delay: Duration) -> Self {
        Self { retries, base_delay }
    }

    /// Run `attempt` until it succeeds, fails permanently, or retries run out.
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.retries.saturating_add(1);
        let mut n = 0;

        loop {
            n += 1;
            match attempt(n).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && n < max_attempts => {
                    let wait = self.delay_for(n, &e);
                    warn!(
                        "{} attempt {}/{} failed: {}; retrying in {:?}",
                        operation, n, max_attempts, e, wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        error!("{} failed after {} attempts: {}", operation, n, e);
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Backoff for the retry after `attempt`. A server's `Retry-After` wins
    /// but never exceeds the larger of the backoff and [`MAX_RETRY_AFTER`].
    fn delay_for(&self, attempt: u32, err: &Error) -> Duration {
        let backoff = self.base_delay.saturating_mul(attempt);
        match err {
            Error::ProviderTransient {
                retry_after: Some(secs),
                ..
            } => Duration::from_secs(*secs).min(backoff.max(MAX_RETRY_AFTER)),
            _ => backoff,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const NO_WAIT: RetryPolicy = RetryPolicy::new(3, Duration::ZERO);

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = NO_WAIT
            .run("translate", |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 3 {
                        Err(Error::ProviderTransient {
                            operation: "translate",
                            reason: "HTTP 503".into(),
                            retry_after: None,
                        })
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeouts_exhaust_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = NO_WAIT
            .run("ocr", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::ProviderTimeout { operation: "ocr" }) }
            })
            .await;
        assert!(matches!(result, Err(Error::ProviderTimeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_fatal_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = NO_WAIT
            .run("ocr", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::OcrParse("not a list".into())) }
            })
            .await;
        assert!(matches!(result, Err(Error::OcrParse(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_grows_and_honors_retry_after() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        let timeout = Error::ProviderTimeout { operation: "translate" };
        assert_eq!(policy.delay_for(1, &timeout), Duration::from_millis(500));
        assert_eq!(policy.delay_for(3, &timeout), Duration::from_millis(1500));
        let limited = Error::ProviderTransient {
            operation: "translate",
            reason: "HTTP 429".into(),
            retry_after: Some(9),
        };
        assert_eq!(policy.delay_for(1, &limited), Duration::from_secs(9));
    }

    #[test]
    fn test_retry_after_is_capped() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let stalled = Error::ProviderTransient {
            operation: "translate",
            reason: "HTTP 429".into(),
            retry_after: Some(86_400),
        };
        assert_eq!(policy.delay_for(1, &stalled), MAX_RETRY_AFTER);

        // A long configured backoff still applies in full
        let slow = RetryPolicy::new(3, Duration::from_secs(50));
        assert_eq!(slow.delay_for(2, &stalled), Duration::from_secs(100));
    }
}
