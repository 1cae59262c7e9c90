//! Dispatch counters
//!
//! Diagnostic-only: nothing here changes delivery behavior.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters updated by the dispatch paths
#[derive(Debug, Default)]
pub struct DispatchStats {
    emitted: AtomicU64,
    filtered: AtomicU64,
    sync_delivered: AtomicU64,
    async_enqueued: AtomicU64,
    async_delivered: AtomicU64,
    overflow_dropped: AtomicU64,
    unregistered_dropped: AtomicU64,
    stopped_dropped: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Emit calls received
    pub emitted: u64,
    /// Emits that reached no slot (global filter or every slot threshold)
    pub filtered: u64,
    /// Messages delivered inline to the sync slot
    pub sync_delivered: u64,
    /// Messages pushed onto the async queue
    pub async_enqueued: u64,
    /// Messages delivered by the consumer thread
    pub async_delivered: u64,
    /// Messages lost to the overflow policy
    pub overflow_dropped: u64,
    /// Queued messages whose async slot vanished or stopped accepting them
    pub unregistered_dropped: u64,
    /// Messages rejected or discarded because the queue was shut down
    pub stopped_dropped: u64,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_emitted(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sync_delivered(&self) {
        self.sync_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_async_enqueued(&self) {
        self.async_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_async_delivered(&self) {
        self.async_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the overflow drop count before this drop
    pub(crate) fn record_overflow_dropped(&self) -> u64 {
        self.overflow_dropped.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn record_unregistered_dropped(&self) {
        self.unregistered_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stopped_dropped(&self) {
        self.stopped_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            emitted: self.emitted.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            sync_delivered: self.sync_delivered.load(Ordering::Relaxed),
            async_enqueued: self.async_enqueued.load(Ordering::Relaxed),
            async_delivered: self.async_delivered.load(Ordering::Relaxed),
            overflow_dropped: self.overflow_dropped.load(Ordering::Relaxed),
            unregistered_dropped: self.unregistered_dropped.load(Ordering::Relaxed),
            stopped_dropped: self.stopped_dropped.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Total messages lost on the async path for any reason
    pub fn total_dropped(&self) -> u64 {
        self.overflow_dropped + self.unregistered_dropped + self.stopped_dropped
    }
}
