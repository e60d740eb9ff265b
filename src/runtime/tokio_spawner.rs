//! Tokio runtime spawner implementation.
//!
//! Each job runs on the runtime's blocking pool. That pool has a thread cap
//! (`max_blocking_threads`), and jobs past it wait in tokio's queue while
//! holding their permits, so the spawner reports the cap as its unit limit
//! and a launcher refuses to start with a larger capacity.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};

use crate::core::spawn::run_guarded;
use crate::core::{Job, Spawn};

/// Tokio's default `max_blocking_threads`.
pub const DEFAULT_UNIT_LIMIT: usize = 512;

/// Spawner that runs each job on a tokio runtime's blocking pool.
///
/// Jobs are synchronous closures, so they go to `spawn_blocking` rather than
/// onto the async worker threads.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: Handle,
    /// Keeps an owned runtime alive for as long as any clone exists.
    owned_runtime: Option<Arc<Runtime>>,
    unit_limit: usize,
    ordinal: Arc<AtomicU64>,
}

impl TokioSpawner {
    /// Create a `TokioSpawner` from a tokio runtime handle.
    ///
    /// The runtime is assumed to keep tokio's default blocking-thread cap;
    /// use [`with_unit_limit`](Self::with_unit_limit) if it was built with a
    /// different `max_blocking_threads`.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            owned_runtime: None,
            unit_limit: DEFAULT_UNIT_LIMIT,
            ordinal: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Declare the `max_blocking_threads` of a borrowed runtime.
    #[must_use]
    pub const fn with_unit_limit(mut self, unit_limit: usize) -> Self {
        self.unit_limit = unit_limit;
        self
    }

    /// Create a `TokioSpawner` owning a new multi-threaded runtime able to
    /// run `max_units` jobs at once.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the runtime cannot be built.
    pub fn with_worker_threads(worker_threads: usize, max_units: usize) -> Result<Self, io::Error> {
        let max_units = max_units.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .max_blocking_threads(max_units)
            .thread_name("launch-gate-tokio")
            .enable_all()
            .build()?;
        Ok(Self {
            handle: runtime.handle().clone(),
            owned_runtime: Some(Arc::new(runtime)),
            unit_limit: max_units,
            ordinal: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Like [`with_worker_threads`](Self::with_worker_threads) with one
    /// worker per CPU.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the runtime cannot be built.
    pub fn with_default_worker_threads(max_units: usize) -> Result<Self, io::Error> {
        Self::with_worker_threads(num_cpus::get(), max_units)
    }
}

impl fmt::Debug for TokioSpawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioSpawner")
            .field("owns_runtime", &self.owned_runtime.is_some())
            .field("unit_limit", &self.unit_limit)
            .field("spawned", &self.ordinal.load(Ordering::Relaxed))
            .finish()
    }
}

impl Spawn for TokioSpawner {
    fn spawn(&self, job: Job) -> io::Result<()> {
        let ordinal = self.ordinal.fetch_add(1, Ordering::Relaxed) + 1;
        let unit = format!("tokio-unit-{ordinal}");
        let cancelled = Arc::new(AtomicBool::new(false));
        let pending = PendingJob {
            job: Some(job),
            cancelled: Arc::clone(&cancelled),
        };

        // A shut-down runtime cancels the task inside `spawn_blocking`,
        // dropping the job before this returns.
        drop(self.handle.spawn_blocking(move || pending.run(&unit)));
        if cancelled.load(Ordering::Acquire) {
            return Err(io::Error::other("tokio runtime is shut down"));
        }
        Ok(())
    }

    fn unit_limit(&self) -> Option<usize> {
        Some(self.unit_limit)
    }
}

/// Job in flight to the blocking pool; flags itself if dropped unrun.
struct PendingJob {
    job: Option<Job>,
    cancelled: Arc<AtomicBool>,
}

impl PendingJob {
    fn run(mut self, unit: &str) {
        if let Some(job) = self.job.take() {
            run_guarded(unit, job, None);
        }
    }
}

impl Drop for PendingJob {
    fn drop(&mut self) {
        if self.job.is_some() {
            self.cancelled.store(true, Ordering::Release);
        }
    }
}
