//! Dispatcher metrics
//!
//! Counters for the caller-facing half of the logger: how many events were
//! queued, dropped or evicted, and how often a provider queue overflowed.
//! Per-provider delivery counts live on [`crate::LogProvider`].

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use fanout_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_dropped();
/// metrics.record_enqueued();
///
/// assert_eq!(metrics.dropped_count(), 1);
/// assert_eq!(metrics.total_enqueued(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Events accepted onto the dispatch queue
    total_enqueued: AtomicU64,

    /// Events rejected because the dispatch queue was full
    dropped_count: AtomicU64,

    /// Number of times a caller found the queue full
    queue_full_events: AtomicU64,

    /// Number of times a caller blocked waiting for queue space
    block_events: AtomicU64,

    /// Queued events evicted by `DropOldest`
    evicted_count: AtomicU64,

    /// Events a full provider queue refused
    provider_overflows: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            total_enqueued: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
            evicted_count: AtomicU64::new(0),
            provider_overflows: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn total_enqueued(&self) -> u64 {
        self.total_enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn evicted_count(&self) -> u64 {
        self.evicted_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn provider_overflows(&self) -> u64 {
        self.provider_overflows.load(Ordering::Relaxed)
    }

    /// Record an accepted event, returning the previous count
    #[inline]
    pub fn record_enqueued(&self) -> u64 {
        self.total_enqueued.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a dropped event, returning the new total
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_evicted(&self) -> u64 {
        self.evicted_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_provider_overflow(&self) -> u64 {
        self.provider_overflows.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of log calls that never reached the queue, as a percentage
    ///
    /// Returns 0.0 if nothing has been logged.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.total_enqueued() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.total_enqueued.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
        self.queue_full_events.store(0, Ordering::Relaxed);
        self.block_events.store(0, Ordering::Relaxed);
        self.evicted_count.store(0, Ordering::Relaxed);
        self.provider_overflows.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            total_enqueued: AtomicU64::new(self.total_enqueued()),
            dropped_count: AtomicU64::new(self.dropped_count()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
            block_events: AtomicU64::new(self.block_events()),
            evicted_count: AtomicU64::new(self.evicted_count()),
            provider_overflows: AtomicU64::new(self.provider_overflows()),
        }
    }
}
