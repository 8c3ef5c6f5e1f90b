//! Dispatch counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters shared by all workers of an engine.
#[derive(Debug, Default)]
pub struct DispatchStats {
    words: AtomicU64,
    cache_hits: AtomicU64,
    remote_calls: AtomicU64,
    remote_failures: AtomicU64,
    store_read_failures: AtomicU64,
    store_write_failures: AtomicU64,
    abandoned_words: AtomicU64,
}

impl DispatchStats {
    pub(crate) fn record_word(&self) {
        self.words.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remote_call(&self) {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remote_failure(&self) {
        self.remote_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store_read_failure(&self) {
        self.store_read_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store_write_failure(&self) {
        self.store_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abandoned(&self) {
        self.abandoned_words.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            words: self.words.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            remote_calls: self.remote_calls.load(Ordering::Relaxed),
            remote_failures: self.remote_failures.load(Ordering::Relaxed),
            store_read_failures: self.store_read_failures.load(Ordering::Relaxed),
            store_write_failures: self.store_write_failures.load(Ordering::Relaxed),
            abandoned_words: self.abandoned_words.load(Ordering::Relaxed),
        }
    }
}

/// Dispatch statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStatsSnapshot {
    pub words: u64,
    pub cache_hits: u64,
    pub remote_calls: u64,
    pub remote_failures: u64,
    pub store_read_failures: u64,
    pub store_write_failures: u64,
    pub abandoned_words: u64,
}

impl DispatchStatsSnapshot {
    pub fn hit_rate(&self) -> f64 {
        if self.words == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.words as f64
        }
    }

    pub fn failure_rate(&self) -> f64 {
        if self.remote_calls == 0 {
            0.0
        } else {
            self.remote_failures as f64 / self.remote_calls as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_on_empty_stats() {
        let snapshot = DispatchStats::default().snapshot();
        assert_eq!(snapshot.hit_rate(), 0.0);
        assert_eq!(snapshot.failure_rate(), 0.0);
    }

    #[test]
    fn test_rates() {
        let stats = DispatchStats::default();
        for _ in 0..4 {
            stats.record_word();
        }
        stats.record_cache_hit();
        stats.record_remote_call();
        stats.record_remote_call();
        stats.record_remote_failure();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.hit_rate(), 0.25);
        assert_eq!(snapshot.failure_rate(), 0.5);
    }
}
