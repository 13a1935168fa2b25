//! Retry Policy (C3): exponential backoff with jitter over any fallible async
//! operation. Ground truth for the formula is the source `retry.py`'s
//! `calculate_backoff_delay`.

use crate::error::KernelError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base: Duration,
    pub multiplier: f64,
    pub cap: Duration,
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base: Duration::from_secs(1),
            multiplier: 2.0,
            cap: Duration::from_secs(60),
            jitter: 0.5,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt numbered `attempt` (1-indexed: the first
    /// retry is `attempt=1`), before jitter is applied.
    fn raw_delay(&self, attempt: u32) -> Duration {
        let scaled = self.base.as_secs_f64() * self.multiplier.powi(attempt as i32 - 1);
        Duration::from_secs_f64(scaled.min(self.cap.as_secs_f64()))
    }

    /// Perturb a raw delay by a uniform jitter factor in `[1-jitter, 1+jitter]`,
    /// floored at 0.1s so a call never retries with zero backoff.
    fn jittered_delay(&self, attempt: u32) -> Duration {
        let raw = self.raw_delay(attempt).as_secs_f64();
        let factor = rand::thread_rng().gen_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        Duration::from_secs_f64((raw * factor).max(0.1))
    }
}

/// Run `op` up to `policy.max_retries + 1` times, sleeping a jittered
/// exponential backoff between attempts, stopping early on a non-retryable
/// error or when `cancel` fires. Returns the last error if every attempt
/// fails.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: RetryPolicy,
    cancel: Option<&CancellationToken>,
    mut op: F,
) -> Result<(T, u32), KernelError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, KernelError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let result = op().await;
        match result {
            Ok(value) => return Ok((value, attempt)),
            Err(err) => {
                let exhausted = attempt > policy.max_retries;
                if exhausted || !err.is_retryable() {
                    return Err(err);
                }
                let delay = policy.jittered_delay(attempt);
                match cancel {
                    Some(token) => {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = token.cancelled() => return Err(KernelError::Cancelled),
                        }
                    }
                    None => tokio::time::sleep(delay).await,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn raw_delay_follows_exponential_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.raw_delay(1), Duration::from_secs(1));
        assert_eq!(policy.raw_delay(2), Duration::from_secs(2));
        assert_eq!(policy.raw_delay(3), Duration::from_secs(4));
    }

    #[test]
    fn raw_delay_is_capped() {
        let policy = RetryPolicy { max_retries: 10, ..RetryPolicy::default() };
        assert_eq!(policy.raw_delay(10), policy.cap);
    }

    #[test]
    fn jittered_delay_stays_within_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let d = policy.jittered_delay(2).as_secs_f64();
            assert!(d >= 2.0 * 0.5 && d <= 2.0 * 1.5 + 0.001);
        }
    }

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy { base: Duration::from_millis(1), cap: Duration::from_millis(5), ..RetryPolicy::default() };
        let calls2 = calls.clone();
        let (value, attempts) = retry_with_backoff(policy, None, move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, KernelError>(42)
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 42);
        assert_eq!(attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_then_succeeds_on_retryable_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy { base: Duration::from_millis(1), cap: Duration::from_millis(5), ..RetryPolicy::default() };
        let calls2 = calls.clone();
        let (value, attempts) = retry_with_backoff(policy, None, move || {
            let calls = calls2.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(KernelError::BackendTimeout("slow".into()))
                } else {
                    Ok(99)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 99);
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn stops_immediately_on_non_retryable_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy { base: Duration::from_millis(1), ..RetryPolicy::default() };
        let calls2 = calls.clone();
        let result = retry_with_backoff(policy, None, move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(KernelError::Validation("bad input".into()))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy { max_retries: 2, base: Duration::from_millis(1), cap: Duration::from_millis(5), ..RetryPolicy::default() };
        let calls2 = calls.clone();
        let result = retry_with_backoff(policy, None, move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(KernelError::BackendTimeout("slow".into()))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
