//! Counters for the oracle pipeline.
//!
//! All counters are backed by atomics for lock-free concurrent access.

use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregated metrics for the request queue and fulfiller.
///
/// Thread-safe via atomics; shared via `Arc<Metrics>`.
pub struct Metrics {
    /// Request records handed to the fulfiller queue.
    pub requests_queued: AtomicU64,
    /// Request records dropped because the queue was full or closed.
    pub requests_dropped: AtomicU64,
    /// Requests successfully fulfilled.
    pub requests_fulfilled: AtomicU64,
    /// Deliveries rejected as already consumed (duplicates from catch-up).
    pub duplicates_skipped: AtomicU64,
    /// Fulfillment attempts that failed for any other reason.
    pub requests_failed: AtomicU64,
    /// Sum of fulfillment latencies in milliseconds (for computing average).
    pub fulfillment_latency_sum_ms: AtomicU64,
}

impl Metrics {
    /// Create a new zeroed metrics instance.
    pub fn new() -> Self {
        Self {
            requests_queued: AtomicU64::new(0),
            requests_dropped: AtomicU64::new(0),
            requests_fulfilled: AtomicU64::new(0),
            duplicates_skipped: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            fulfillment_latency_sum_ms: AtomicU64::new(0),
        }
    }

    pub fn record_queued(&self) {
        self.requests_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.requests_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful fulfillment with its latency.
    pub fn record_fulfillment(&self, latency_ms: u64) {
        self.requests_fulfilled.fetch_add(1, Ordering::Relaxed);
        self.fulfillment_latency_sum_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Compute average fulfillment latency in milliseconds, or 0 if none.
    pub fn avg_latency_ms(&self) -> u64 {
        let count = self.requests_fulfilled.load(Ordering::Relaxed);
        if count == 0 {
            return 0;
        }
        self.fulfillment_latency_sum_ms.load(Ordering::Relaxed) / count
    }

    /// Serialize metrics as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "requests_queued": self.requests_queued.load(Ordering::Relaxed),
            "requests_dropped": self.requests_dropped.load(Ordering::Relaxed),
            "requests_fulfilled": self.requests_fulfilled.load(Ordering::Relaxed),
            "duplicates_skipped": self.duplicates_skipped.load(Ordering::Relaxed),
            "requests_failed": self.requests_failed.load(Ordering::Relaxed),
            "avg_fulfillment_latency_ms": self.avg_latency_ms(),
        })
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
