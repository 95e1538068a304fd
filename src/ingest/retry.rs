//! Exponential-backoff retry decorator (spec §4.4): retries only the
//! `Transient`/`RateLimited` error classes; anything else aborts the source
//! immediately, mirroring the source's `retry_on_failure`.

use std::future::Future;
use std::time::Duration;

use crate::ingest::IngestError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay_ms: u64, backoff_factor: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_millis(initial_delay_ms),
            backoff_factor,
        }
    }

    /// Runs `op` up to `max_attempts` times, retrying only transient/
    /// rate-limited failures, with exponential backoff between attempts.
    /// Returns the retry count alongside the result (spec §4.4's per-run
    /// "retry count" statistic) — 0 when the first attempt succeeds or
    /// fails with a non-retryable error.
    pub async fn run<F, Fut, T>(&self, mut op: F) -> (Result<T, IngestError>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, IngestError>>,
    {
        let mut delay = self.initial_delay;
        let mut last_err = None;

        for attempt in 1..=self.max_attempts {
            match op().await {
                Ok(value) => return (Ok(value), attempt - 1),
                Err(e @ (IngestError::Transient(_) | IngestError::RateLimited(_))) => {
                    last_err = Some(e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(delay).await;
                        delay = delay.mul_f64(self.backoff_factor);
                    }
                }
                Err(other) => return (Err(other), attempt - 1),
            }
        }

        (
            Err(last_err.expect("at least one attempt runs")),
            self.max_attempts - 1,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let policy = RetryPolicy::new(3, 1, 1.0);
        let attempts = AtomicU32::new(0);
        let (result, retries) = policy
            .run(|| async {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(IngestError::Transient("timeout".into()))
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(retries, 2);
    }

    #[tokio::test]
    async fn does_not_retry_non_transient_errors() {
        let policy = RetryPolicy::new(3, 1, 1.0);
        let attempts = AtomicU32::new(0);
        let (result, retries): (Result<(), _>, u32) = policy
            .run(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(IngestError::InvalidSource("bad schema".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(retries, 0);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_surfaces_last_error() {
        let policy = RetryPolicy::new(2, 1, 1.0);
        let (result, retries): (Result<(), _>, u32) = policy
            .run(|| async { Err(IngestError::Transient("still down".into())) })
            .await;
        assert!(matches!(result, Err(IngestError::Transient(_))));
        assert_eq!(retries, 1);
    }
}
