//! Exponential backoff for fallible repository calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Attempts and base delay for [`retry_with_backoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_ms: 100,
        }
    }
}

impl RetryPolicy {
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        retry_with_backoff(self.max_retries, self.delay_ms, operation).await
    }
}

/// Runs `operation`, retrying up to `max_retries` more times on error.
///
/// The wait before retry `n` (0-based) is `delay_ms * 2^n`, so with
/// `delay_ms = 100` the waits are 100 ms, 200 ms, 400 ms. The last error is
/// returned once attempts run out.
pub async fn retry_with_backoff<T, E, F, Fut>(
    max_retries: u32,
    delay_ms: u64,
    mut operation: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_retries {
                    return Err(err);
                }
                let wait_ms = delay_ms.saturating_mul(1u64 << attempt.min(32));
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries,
                    wait_ms,
                    error = %err,
                    "repository call failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 1, || {
            let c = Arc::clone(&c);
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(format!("flaky {n}"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<(), String> = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                Err(format!("failure {n}"))
            }
        })
        .await;
        assert_eq!(result.unwrap_err(), "failure 2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles() {
        let start = tokio::time::Instant::now();
        let result: Result<(), &str> =
            retry_with_backoff(3, 100, || async { Err("down") }).await;
        assert!(result.is_err());
        // 100 + 200 + 400
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(700));
        assert!(elapsed < Duration::from_millis(750));
    }

    #[tokio::test]
    async fn test_policy_zero_retries_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let policy = RetryPolicy {
            max_retries: 0,
            delay_ms: 0,
        };
        let result: Result<(), &str> = policy
            .run(|| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("nope")
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
