//! Query-timing metrics (spec §4.2): counters plus a bounded ring buffer of
//! slow queries, exposed read-only and never consulted to gate a request.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SlowQuery {
    pub label: String,
    pub millis: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryStatsSnapshot {
    pub query_count: u64,
    pub total_millis: u64,
    pub avg_millis: f64,
    pub slow_queries: Vec<SlowQuery>,
}

pub struct QueryStats {
    count: AtomicU64,
    total_millis: AtomicU64,
    threshold_ms: u64,
    window: usize,
    slow: Mutex<VecDeque<SlowQuery>>,
}

impl QueryStats {
    pub fn new(threshold_ms: u64, window: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            total_millis: AtomicU64::new(0),
            threshold_ms,
            window,
            slow: Mutex::new(VecDeque::with_capacity(window)),
        }
    }

    pub fn record(&self, elapsed: Duration, label: &'static str) {
        let millis = elapsed.as_millis() as u64;
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_millis.fetch_add(millis, Ordering::Relaxed);

        if millis > self.threshold_ms {
            let mut slow = self.slow.lock().expect("query stats lock poisoned");
            if slow.len() >= self.window {
                slow.pop_front();
            }
            slow.push_back(SlowQuery {
                label: label.to_string(),
                millis,
            });
        }
    }

    pub fn snapshot(&self) -> QueryStatsSnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let total_millis = self.total_millis.load(Ordering::Relaxed);
        let avg_millis = if count > 0 {
            total_millis as f64 / count as f64
        } else {
            0.0
        };
        let slow_queries = self
            .slow
            .lock()
            .expect("query stats lock poisoned")
            .iter()
            .cloned()
            .collect();

        QueryStatsSnapshot {
            query_count: count,
            total_millis,
            avg_millis,
            slow_queries,
        }
    }
}
