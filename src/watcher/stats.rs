//! Counters for watcher activity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Statistics for configuration watching.
#[derive(Debug, Default)]
pub struct WatcherStats {
    pub events_received: AtomicU64,
    pub events_matched: AtomicU64,
    pub events_ignored: AtomicU64,
    pub events_absorbed: AtomicU64,
    pub reloads_triggered: AtomicU64,
    pub errors: AtomicU64,
    pub generations: AtomicU64,
}

impl WatcherStats {
    /// Create new stats tracker.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> WatcherStatsSnapshot {
        WatcherStatsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_matched: self.events_matched.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
            events_absorbed: self.events_absorbed.load(Ordering::Relaxed),
            reloads_triggered: self.reloads_triggered.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            generations: self.generations.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of watcher stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WatcherStatsSnapshot {
    pub events_received: u64,
    pub events_matched: u64,
    pub events_ignored: u64,
    pub events_absorbed: u64,
    pub reloads_triggered: u64,
    pub errors: u64,
    pub generations: u64,
}
