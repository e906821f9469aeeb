//! Metrics registry for memdb
//!
//! Counters only, monotonic, reset when the store is opened.

use std::sync::atomic::{AtomicU64, Ordering};

/// Operational counters of one store.
///
/// Relaxed ordering: counters are exact once the counted operations have
/// completed, but carry no ordering with respect to store state.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    read_txns: AtomicU64,
    write_txns: AtomicU64,
    commits: AtomicU64,
    aborts: AtomicU64,
    inserts: AtomicU64,
    deletes: AtomicU64,
    watches_closed: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_read_txns(&self) {
        self.read_txns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_write_txns(&self) {
        self.write_txns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_commits(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_aborts(&self) {
        self.aborts.fetch_add(1, Ordering::Relaxed);
    }

    /// Records inserted or updated by a commit
    pub fn add_inserts(&self, count: u64) {
        self.inserts.fetch_add(count, Ordering::Relaxed);
    }

    /// Records deleted by a commit
    pub fn add_deletes(&self, count: u64) {
        self.deletes.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_watches_closed(&self, count: u64) {
        self.watches_closed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    /// Current values as JSON, keys in fixed order
    pub fn to_json(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"{{"read_txns":{},"write_txns":{},"commits":{},"aborts":{},"inserts":{},"deletes":{},"watches_closed":{}}}"#,
            s.read_txns, s.write_txns, s.commits, s.aborts, s.inserts, s.deletes, s.watches_closed,
        )
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            read_txns: self.read_txns.load(Ordering::Relaxed),
            write_txns: self.write_txns.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            watches_closed: self.watches_closed.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub read_txns: u64,
    pub write_txns: u64,
    pub commits: u64,
    pub aborts: u64,
    pub inserts: u64,
    pub deletes: u64,
    pub watches_closed: u64,
}
