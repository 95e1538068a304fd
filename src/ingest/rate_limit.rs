//! Per-source rate limiter (spec §4.4): sleeps a uniform random amount in
//! `[min_delay, max_delay]` between consecutive requests to the same source.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::Mutex;

pub struct RateLimiter {
    min_delay: Duration,
    max_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_delay_secs: f64, max_delay_secs: f64) -> Self {
        Self {
            min_delay: Duration::from_secs_f64(min_delay_secs.max(0.0)),
            max_delay: Duration::from_secs_f64(max_delay_secs.max(min_delay_secs.max(0.0))),
            last_request: Mutex::new(None),
        }
    }

    /// Blocks (asynchronously) until it is this source's turn to issue
    /// another request. A no-op for the very first call.
    pub async fn wait(&self) {
        let delay = if self.max_delay > self.min_delay {
            let min = self.min_delay.as_secs_f64();
            let max = self.max_delay.as_secs_f64();
            Duration::from_secs_f64(rand::thread_rng().gen_range(min..max))
        } else {
            self.min_delay
        };

        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < delay {
                tokio::time::sleep(delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
