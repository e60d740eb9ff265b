//! Launcher statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Statistics about launcher utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherStats {
    /// Configured concurrency cap.
    pub capacity: usize,

    /// Permits currently available.
    pub available: usize,

    /// Tasks currently holding a permit.
    pub in_flight: usize,

    /// Total tasks handed to an execution unit.
    pub launched: u64,

    /// Total launch attempts turned down.
    pub rejected: u64,

    /// Total tasks that returned normally.
    pub completed: u64,

    /// Total tasks that panicked.
    pub panicked: u64,
}

/// Internal counters for launcher statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct LaunchCounters {
    launched: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
}

impl LaunchCounters {
    pub fn record_launched(&self) {
        self.launched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// A launched job was dropped by its execution unit before running.
    pub fn record_unrun(&self) {
        self.launched.fetch_sub(1, Ordering::Relaxed);
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_panicked(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, capacity: usize, available: usize) -> LauncherStats {
        LauncherStats {
            capacity,
            available,
            in_flight: capacity.saturating_sub(available),
            launched: self.launched.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }
}
