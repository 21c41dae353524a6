use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Live counters for one stage, shared between the queue and its handlers.
#[derive(Debug, Default)]
pub struct StageCounters {
    requested: AtomicUsize,
    fetched: AtomicUsize,
    fetch_failed: AtomicUsize,
    persisted: AtomicUsize,
    skipped: AtomicUsize,
    warnings: AtomicUsize,
}

impl StageCounters {
    pub fn record_request(&self) {
        self.requested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetched(&self) {
        self.fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persisted(&self) {
        self.persisted.fetch_add(1, Ordering::Relaxed);
    }

    /// A fetched payload that produced no stored record.
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_warnings(&self, count: usize) {
        self.warnings.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StageStats {
        StageStats {
            requested: self.requested.load(Ordering::Relaxed),
            fetched: self.fetched.load(Ordering::Relaxed),
            fetch_failed: self.fetch_failed.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStats {
    pub requested: usize,
    pub fetched: usize,
    pub fetch_failed: usize,
    pub persisted: usize,
    pub skipped: usize,
    pub warnings: usize,
}

impl StageStats {
    pub fn failures(&self) -> usize {
        self.fetch_failed + self.skipped
    }
}

/// Outcome of one scrape cycle. Individual failures are counted, never raised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeReport {
    pub fund_list: StageStats,
    pub overview: StageStats,
    pub holding: StageStats,
    pub distribution: StageStats,
    pub elapsed: Duration,
}

impl ScrapeReport {
    pub fn stages(&self) -> [(&'static str, StageStats); 4] {
        [
            ("fund_list", self.fund_list),
            ("overview", self.overview),
            ("holding", self.holding),
            ("distribution", self.distribution),
        ]
    }

    pub fn total_failures(&self) -> usize {
        self.stages().iter().map(|(_, s)| s.failures()).sum()
    }
}
