use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Backoff policy for outbound provider calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Spread each delay randomly across 0.5x..1.5x
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before the attempt following `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let base_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64) as u64;

        if !self.jitter || capped_ms == 0 {
            return Duration::from_millis(capped_ms);
        }
        let half = capped_ms / 2;
        Duration::from_millis(half + fastrand::u64(0..=capped_ms))
    }
}

/// Errors that know whether repeating the call could help
pub trait RetryableError: std::error::Error {
    fn is_retryable(&self) -> bool;
}

/// Run `operation` until it succeeds, fails with a non-retryable error,
/// or the policy's attempts are used up.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", label, attempt);
                }
                return Ok(value);
            }
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    label, attempt, max_attempts, delay, err
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                debug!("{} giving up after {} attempt(s): {}", label, attempt, err);
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error("upstream error (retryable: {retryable})")]
    struct UpstreamError {
        retryable: bool,
    }

    impl RetryableError for UpstreamError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            multiplier: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn test_succeeds_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&fast_policy(3), "quote", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, UpstreamError>(7)
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&fast_policy(3), "quote", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(UpstreamError { retryable: true })
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = retry_with_backoff(&fast_policy(3), "quote", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(UpstreamError { retryable: true })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_on_non_retryable_error() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = retry_with_backoff(&fast_policy(3), "quote", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(UpstreamError { retryable: false })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            multiplier: 2.0,
            jitter: false,
        };

        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(300));
        assert_eq!(policy.delay_after(4), Duration::from_millis(300));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy {
            jitter: true,
            ..fast_policy(3)
        };
        for _ in 0..50 {
            let delay = policy.delay_after(1).as_millis();
            assert!((2..=7).contains(&delay), "delay {} out of range", delay);
        }
    }
}
