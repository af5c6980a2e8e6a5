//! Engine diagnostics.
//!
//! Collected outside the deterministic context (wall-clock `Instant`,
//! relaxed atomics); purely observational, no role in correctness or
//! replay.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time snapshot of engine counters.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineMetrics {
    /// Messages fully processed since construction.
    pub messages_processed: u64,
    /// Mean update duration in microseconds.
    pub avg_update_micros: f64,
    /// Worst-case update duration in microseconds.
    pub max_update_micros: u64,
    /// Observer notification cycles delivered.
    pub notifications: u64,
    /// Notification requests coalesced into an already-pending cycle.
    pub coalesced_notifications: u64,
    /// Largest queue length observed at enqueue time.
    pub queue_high_watermark: u64,
    /// Current message log length.
    pub log_len: usize,
    /// Log entries evicted to stay under the capacity bound.
    pub evicted_entries: u64,
}

/// Internal atomic counters.
#[derive(Debug, Default)]
pub(crate) struct MetricCells {
    messages: AtomicU64,
    update_nanos_total: AtomicU64,
    update_nanos_max: AtomicU64,
    notifications: AtomicU64,
    coalesced: AtomicU64,
    queue_high_watermark: AtomicU64,
}

impl MetricCells {
    pub(crate) fn record_update(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.messages.fetch_add(1, Ordering::Relaxed);
        self.update_nanos_total.fetch_add(nanos, Ordering::Relaxed);
        self.update_nanos_max.fetch_max(nanos, Ordering::Relaxed);
    }

    pub(crate) fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn note_queue_len(&self, len: usize) {
        self.queue_high_watermark
            .fetch_max(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, log_len: usize, evicted_entries: u64) -> EngineMetrics {
        let messages = self.messages.load(Ordering::Relaxed);
        let total_nanos = self.update_nanos_total.load(Ordering::Relaxed);
        let avg_update_micros = if messages == 0 {
            0.0
        } else {
            total_nanos as f64 / messages as f64 / 1_000.0
        };

        EngineMetrics {
            messages_processed: messages,
            avg_update_micros,
            max_update_micros: self.update_nanos_max.load(Ordering::Relaxed) / 1_000,
            notifications: self.notifications.load(Ordering::Relaxed),
            coalesced_notifications: self.coalesced.load(Ordering::Relaxed),
            queue_high_watermark: self.queue_high_watermark.load(Ordering::Relaxed),
            log_len,
            evicted_entries,
        }
    }
}
