//! Host-facing port for job-scheduling frameworks.
//!
//! A scheduler adapter depends on [`TaskRunner`] only, so the launcher stays
//! framework-agnostic. The adapter must implement retry-on-rejection itself:
//! runners never queue rejected work.

use std::io;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error};

use super::launcher::{BoundedLauncher, DEFAULT_NAME};
use super::spawn::{Job, Spawn, ThreadSpawner};
use super::ConfigurationError;

/// Thread-pool contract offered to a host scheduler.
pub trait TaskRunner: Send + Sync {
    /// Set the concurrency cap before `start`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` once started or for an invalid capacity.
    fn configure(&mut self, capacity: usize) -> Result<(), ConfigurationError>;

    /// Make the runner ready to accept tasks.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if already started or misconfigured.
    fn start(&mut self) -> Result<(), ConfigurationError>;

    /// Run `task` asynchronously; `false` means rejected and not run.
    fn submit(&self, task: Job) -> bool;

    /// Block until a `submit` is likely to succeed; 0 means stop retrying.
    fn wait_for_capacity(&self) -> usize;

    /// Stop accepting tasks, optionally waiting for running ones.
    fn shutdown(&self, wait: bool);

    /// Maximum number of concurrently running tasks.
    fn capacity(&self) -> usize;
}

impl<S: Spawn> TaskRunner for BoundedLauncher<S> {
    fn configure(&mut self, capacity: usize) -> Result<(), ConfigurationError> {
        Self::configure(self, capacity)
    }

    fn start(&mut self) -> Result<(), ConfigurationError> {
        Self::start(self)
    }

    fn submit(&self, task: Job) -> bool {
        self.launch(task)
    }

    fn wait_for_capacity(&self) -> usize {
        self.block_for_availability()
    }

    fn shutdown(&self, wait: bool) {
        Self::shutdown(self, wait);
    }

    fn capacity(&self) -> usize {
        Self::capacity(self)
    }
}

/// Runner without a cap: every task is launched and nothing ever blocks.
///
/// Suitable only when the host can tolerate an unbounded number of
/// simultaneous execution units.
pub struct UnboundedLauncher<S = ThreadSpawner> {
    spawner: S,
    started: AtomicBool,
}

impl UnboundedLauncher<ThreadSpawner> {
    /// Create a runner whose units are named `{name}-unit-{n}`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::with_spawner(ThreadSpawner::new(format!("{}-unit-", name.into())))
    }
}

impl Default for UnboundedLauncher<ThreadSpawner> {
    fn default() -> Self {
        Self::named(DEFAULT_NAME)
    }
}

impl<S: Spawn> UnboundedLauncher<S> {
    /// Create a runner that starts units through `spawner`.
    pub const fn with_spawner(spawner: S) -> Self {
        Self {
            spawner,
            started: AtomicBool::new(false),
        }
    }

    /// Whether `start` has been called.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn spawn(&self, task: Job) -> io::Result<()> {
        self.spawner.spawn(task)
    }
}

impl<S: Spawn> TaskRunner for UnboundedLauncher<S> {
    fn configure(&mut self, capacity: usize) -> Result<(), ConfigurationError> {
        NonZeroUsize::new(capacity).ok_or(ConfigurationError::InvalidCapacity)?;
        debug!(capacity, "unbounded launcher ignores capacity");
        Ok(())
    }

    fn start(&mut self) -> Result<(), ConfigurationError> {
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    fn submit(&self, task: Job) -> bool {
        match self.spawn(task) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "failed to spawn execution unit");
                false
            }
        }
    }

    fn wait_for_capacity(&self) -> usize {
        usize::MAX
    }

    fn shutdown(&self, _wait: bool) {}

    fn capacity(&self) -> usize {
        usize::MAX
    }
}
