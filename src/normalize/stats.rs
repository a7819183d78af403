//! Counters for items dropped during normalization.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Counts upstream items that could not be normalized and were dropped.
#[derive(Debug, Default)]
pub struct ShapeStats {
    dropped_summaries: AtomicU64,
    dropped_episodes: AtomicU64,
    dropped_servers: AtomicU64,
}

impl ShapeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dropped_summary(&self) {
        self.dropped_summaries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_episode(&self) {
        self.dropped_episodes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_server(&self) {
        self.dropped_servers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_summaries(&self) -> u64 {
        self.dropped_summaries.load(Ordering::Relaxed)
    }

    pub fn dropped_episodes(&self) -> u64 {
        self.dropped_episodes.load(Ordering::Relaxed)
    }

    pub fn dropped_servers(&self) -> u64 {
        self.dropped_servers.load(Ordering::Relaxed)
    }
}
