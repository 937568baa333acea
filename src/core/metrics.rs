//! Logger metrics for observability
//!
//! Counters for the consumer loop (records and bytes written, short
//! writes, sink faults) and for the dispatcher front-end (submitted,
//! dropped, queue-full and blocking events).

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use async_log_sink::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_written(12);
/// metrics.record_dropped();
///
/// assert_eq!(metrics.records_written(), 1);
/// assert_eq!(metrics.bytes_written(), 12);
/// assert_eq!(metrics.dropped_count(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records handed to the buffered writer by the consumer loop
    records_written: AtomicU64,

    /// Bytes accepted by the buffered writer
    bytes_written: AtomicU64,

    /// Writes that stopped short and left a stowed remainder
    short_writes: AtomicU64,

    /// Unrecoverable sink errors that faulted the consumer loop
    sink_faults: AtomicU64,

    /// Records accepted by the dispatcher queue
    submitted: AtomicU64,

    /// Records dropped by the dispatcher overflow policy
    dropped_count: AtomicU64,

    /// Number of times the dispatcher queue was found full
    queue_full_events: AtomicU64,

    /// Number of times a submitter blocked waiting for queue space
    block_events: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            records_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            short_writes: AtomicU64::new(0),
            sink_faults: AtomicU64::new(0),
            submitted: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn short_writes(&self) -> u64 {
        self.short_writes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_faults(&self) -> u64 {
        self.sink_faults.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
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

    /// Record a record fully handed to the writer
    #[inline]
    pub fn record_written(&self, bytes: usize) -> u64 {
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
        self.records_written.fetch_add(1, Ordering::Relaxed)
    }

    /// Record bytes accepted without completing a record
    #[inline]
    pub fn record_partial(&self, bytes: usize) {
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_short_write(&self) -> u64 {
        self.short_writes.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_fault(&self) -> u64 {
        self.sink_faults.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_submitted(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a dropped record, returning the previous drop count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0) of everything offered
    /// to the dispatcher
    ///
    /// Returns 0.0 if nothing has been submitted.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.submitted() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.records_written.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.short_writes.store(0, Ordering::Relaxed);
        self.sink_faults.store(0, Ordering::Relaxed);
        self.submitted.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
        self.queue_full_events.store(0, Ordering::Relaxed);
        self.block_events.store(0, Ordering::Relaxed);
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
            records_written: AtomicU64::new(self.records_written()),
            bytes_written: AtomicU64::new(self.bytes_written()),
            short_writes: AtomicU64::new(self.short_writes()),
            sink_faults: AtomicU64::new(self.sink_faults()),
            submitted: AtomicU64::new(self.submitted()),
            dropped_count: AtomicU64::new(self.dropped_count()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
            block_events: AtomicU64::new(self.block_events()),
        }
    }
}
