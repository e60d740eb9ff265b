//! Bounded launcher: admission control for fire-and-forget tasks.
//!
//! A `BoundedLauncher` starts one execution unit per accepted task and caps
//! how many run at once. Admission is all-or-nothing per attempt: a task is
//! either launched under a permit right away or rejected, never queued.
//!
//! # Lifecycle
//!
//! ```text
//! Unconfigured -> Configured -> Running -> ShuttingDown -> Drained
//! ```
//!
//! `configure` and `start` take `&mut self`; everything used after start
//! (`launch`, `block_for_availability`, `shutdown`) takes `&self` so the
//! launcher can be shared behind an `Arc`.
//!
//! # Backpressure
//!
//! A caller that needs its task to run eventually loops: `launch`, and on
//! rejection `block_for_availability` then retry, until accepted or the hint
//! comes back as 0 (shutdown). [`BoundedLauncher::launch_until_admitted`]
//! packages that loop.
//!
//! ```rust,ignore
//! use prometheus_launch_gate::core::BoundedLauncher;
//!
//! let mut launcher = BoundedLauncher::named("ingest");
//! launcher.configure(64)?;
//! launcher.start()?;
//!
//! if !launcher.launch(|| do_work()) {
//!     // at capacity or shut down
//! }
//!
//! launcher.shutdown(true);
//! ```

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use super::gate::{AdmissionGate, Permit};
use super::spawn::{Job, Spawn, ThreadSpawner};
use super::stats::{LaunchCounters, LauncherStats};
use super::ConfigurationError;

/// Capacity used when `start` is called without `configure`.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Instance name used when none is given.
pub const DEFAULT_NAME: &str = "launcher";

/// Lifecycle state of a [`BoundedLauncher`].
///
/// States only move forward; the numeric order is the lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LauncherState {
    /// Created, capacity not set explicitly.
    Unconfigured = 0,
    /// Capacity set, gate not created yet.
    Configured = 1,
    /// Gate created; tasks are admitted.
    Running = 2,
    /// Shutdown signalled; no new admissions.
    ShuttingDown = 3,
    /// Shutdown waited for every admitted task to release its permit.
    Drained = 4,
}

impl LauncherState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Unconfigured,
            1 => Self::Configured,
            2 => Self::Running,
            3 => Self::ShuttingDown,
            _ => Self::Drained,
        }
    }
}

/// Why a launch attempt was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// `start` has not been called.
    NotStarted,
    /// Shutdown has been signalled.
    ShutDown,
    /// Every permit is held by a running task.
    AtCapacity,
    /// A permit was taken but the execution unit could not be created.
    SpawnFailed,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "launcher not started"),
            Self::ShutDown => write!(f, "launcher is shut down"),
            Self::AtCapacity => write!(f, "launcher at capacity"),
            Self::SpawnFailed => write!(f, "execution unit could not be spawned"),
        }
    }
}

/// A rejected launch attempt, handing the task back when it was not consumed.
pub struct Rejected<F> {
    task: Option<F>,
    reason: Rejection,
}

impl<F> Rejected<F> {
    const fn returned(task: F, reason: Rejection) -> Self {
        Self {
            task: Some(task),
            reason,
        }
    }

    /// Reason for the rejection.
    #[must_use]
    pub const fn reason(&self) -> Rejection {
        self.reason
    }

    /// Take the task back for another attempt.
    ///
    /// Returns `None` for [`Rejection::SpawnFailed`]: the task was moved into
    /// the spawner and dropped there.
    pub fn into_task(self) -> Option<F> {
        self.task
    }
}

impl<F> fmt::Debug for Rejected<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("reason", &self.reason)
            .field("task_returned", &self.task.is_some())
            .finish()
    }
}

impl<F> fmt::Display for Rejected<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task rejected: {}", self.reason)
    }
}

/// Holds a task's permit for the lifetime of its execution unit.
///
/// Dropped exactly once, whether the task returns or unwinds, or the unit is
/// never started at all. A job dropped unrun is counted as rejected.
struct TaskGuard {
    _permit: Permit,
    counters: Arc<LaunchCounters>,
    entered: bool,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if !self.entered {
            self.counters.record_unrun();
            warn!("task dropped before its execution unit ran it");
            return;
        }
        if thread::panicking() {
            self.counters.record_panicked();
        } else {
            self.counters.record_completed();
        }
    }
}

/// Launches tasks on fresh execution units under a fixed concurrency cap.
pub struct BoundedLauncher<S = ThreadSpawner> {
    id: Uuid,
    name: String,
    capacity: NonZeroUsize,
    state: AtomicU8,
    shutdown: AtomicBool,
    gate: Option<Arc<AdmissionGate>>,
    spawner: S,
    counters: Arc<LaunchCounters>,
}

impl BoundedLauncher<ThreadSpawner> {
    /// Create an unconfigured launcher with the default name and thread spawner.
    #[must_use]
    pub fn new() -> Self {
        Self::named(DEFAULT_NAME)
    }

    /// Create an unconfigured launcher whose units are named `{name}-unit-{n}`.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let spawner = ThreadSpawner::new(format!("{name}-unit-"));
        Self::with_spawner(name, spawner)
    }
}

impl Default for BoundedLauncher<ThreadSpawner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Spawn> BoundedLauncher<S> {
    /// Create an unconfigured launcher that starts units through `spawner`.
    pub fn with_spawner(name: impl Into<String>, spawner: S) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            capacity: NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            state: AtomicU8::new(LauncherState::Unconfigured as u8),
            shutdown: AtomicBool::new(false),
            gate: None,
            spawner,
            counters: Arc::new(LaunchCounters::default()),
        }
    }

    /// Set the concurrency cap.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError::InvalidCapacity` if `capacity` is 0
    /// - `ConfigurationError::AlreadyStarted` once `start` has succeeded
    /// - `ConfigurationError::ShutDown` if shut down before starting
    pub fn configure(&mut self, capacity: usize) -> Result<(), ConfigurationError> {
        self.ensure_not_started()?;
        self.capacity = NonZeroUsize::new(capacity).ok_or(ConfigurationError::InvalidCapacity)?;
        self.state
            .store(LauncherState::Configured as u8, Ordering::Release);
        debug!(launcher_id = %self.id, capacity, "launcher configured");
        Ok(())
    }

    /// Replace the execution-unit factory.
    ///
    /// # Errors
    ///
    /// Fails like [`configure`](Self::configure) once started or shut down.
    pub fn set_spawner(&mut self, spawner: S) -> Result<(), ConfigurationError> {
        self.ensure_not_started()?;
        self.spawner = spawner;
        Ok(())
    }

    /// Create the admission gate and begin accepting tasks.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError::AlreadyStarted` on a second call
    /// - `ConfigurationError::ShutDown` if shut down before starting
    /// - `ConfigurationError::UnitLimitExceeded` if the spawner cannot run
    ///   `capacity` units at once
    pub fn start(&mut self) -> Result<(), ConfigurationError> {
        self.ensure_not_started()?;
        if let Some(limit) = self.spawner.unit_limit() {
            if self.capacity.get() > limit {
                return Err(ConfigurationError::UnitLimitExceeded {
                    capacity: self.capacity.get(),
                    limit,
                });
            }
        }
        self.gate = Some(Arc::new(AdmissionGate::new(self.capacity)));
        self.state.store(LauncherState::Running as u8, Ordering::Release);
        info!(
            launcher_id = %self.id,
            name = %self.name,
            capacity = self.capacity.get(),
            "launcher started"
        );
        Ok(())
    }

    /// Launch `task` on a new execution unit if a permit is available.
    ///
    /// Returns `false` without running the task when the launcher is not
    /// running or at capacity. Never blocks and never waits for the task.
    pub fn launch<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.try_launch(task).is_ok()
    }

    /// Like [`launch`](Self::launch), but hands the task back on rejection.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] carrying the reason and, unless spawning failed,
    /// the untouched task.
    pub fn try_launch<F>(&self, task: F) -> Result<(), Rejected<F>>
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(gate) = self.gate.as_ref() else {
            return Err(Rejected::returned(task, Rejection::NotStarted));
        };
        if self.shutdown.load(Ordering::Acquire) {
            self.counters.record_rejected();
            return Err(Rejected::returned(task, Rejection::ShutDown));
        }
        let Some(permit) = gate.try_permit() else {
            self.counters.record_rejected();
            trace!(launcher_id = %self.id, "launch rejected: at capacity");
            return Err(Rejected::returned(task, Rejection::AtCapacity));
        };

        let mut guard = TaskGuard {
            _permit: permit,
            counters: Arc::clone(&self.counters),
            entered: false,
        };
        let job: Job = Box::new(move || {
            guard.entered = true;
            task();
            drop(guard);
        });

        // Counted up front: the guard moves it to `rejected` if the job is dropped unrun.
        self.counters.record_launched();
        match self.spawner.spawn(job) {
            Ok(()) => {
                trace!(launcher_id = %self.id, available = gate.available(), "task launched");
                Ok(())
            }
            Err(e) => {
                error!(launcher_id = %self.id, error = %e, "failed to spawn execution unit");
                Err(Rejected {
                    task: None,
                    reason: Rejection::SpawnFailed,
                })
            }
        }
    }

    /// Launch `task`, blocking for capacity between attempts.
    ///
    /// Returns `false` once shutdown is observed (or the launcher was never
    /// started, or spawning failed); the task is then dropped unrun.
    pub fn launch_until_admitted<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut task = task;
        loop {
            match self.try_launch(task) {
                Ok(()) => return true,
                Err(rejected) => {
                    let Some(returned) = rejected.into_task() else {
                        return false;
                    };
                    if self.block_for_availability() == 0 {
                        return false;
                    }
                    task = returned;
                }
            }
        }
    }

    /// Block until some capacity is available and return a hint of how much.
    ///
    /// Returns 0 immediately once shutdown has been signalled (or before
    /// start). Otherwise the hint is positive when returned but reserves
    /// nothing; the next `launch` may still be rejected.
    pub fn block_for_availability(&self) -> usize {
        if self.shutdown.load(Ordering::Acquire) {
            return 0;
        }
        self.gate
            .as_ref()
            .map_or(0, |gate| gate.block_until_available())
    }

    /// Stop admitting tasks, optionally waiting for admitted ones to finish.
    ///
    /// Idempotent. Running tasks are never interrupted; without
    /// `wait_for_completion` they finish unobserved in the background.
    pub fn shutdown(&self, wait_for_completion: bool) {
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            if self.gate.is_some() {
                self.advance(LauncherState::ShuttingDown);
                info!(launcher_id = %self.id, wait_for_completion, "launcher shutting down");
            } else {
                // Nothing was ever admitted.
                self.advance(LauncherState::Drained);
                info!(launcher_id = %self.id, "launcher shut down before start");
            }
        }

        if !wait_for_completion {
            return;
        }
        if let Some(gate) = self.gate.as_ref() {
            debug!(launcher_id = %self.id, in_use = gate.in_use(), "waiting for drain");
            gate.wait_for_drain();
            if self.advance(LauncherState::Drained) {
                info!(launcher_id = %self.id, "launcher drained");
            }
        }
    }

    /// Configured concurrency cap.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LauncherState {
        LauncherState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether shutdown has been signalled.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Instance identifier recorded on log events.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Instance name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execution-unit factory.
    #[must_use]
    pub const fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Get current launcher statistics.
    #[must_use]
    pub fn stats(&self) -> LauncherStats {
        let available = self
            .gate
            .as_ref()
            .map_or(self.capacity(), |gate| gate.available());
        self.counters.snapshot(self.capacity(), available)
    }

    fn ensure_not_started(&self) -> Result<(), ConfigurationError> {
        if self.gate.is_some() {
            return Err(ConfigurationError::AlreadyStarted);
        }
        if self.is_shutdown() {
            return Err(ConfigurationError::ShutDown);
        }
        Ok(())
    }

    /// Move the state forward to `to`; returns whether this call moved it.
    fn advance(&self, to: LauncherState) -> bool {
        self.state.fetch_max(to as u8, Ordering::AcqRel) < to as u8
    }
}

#[cfg(feature = "tokio-runtime")]
impl<S: Spawn> BoundedLauncher<S> {
    /// Async [`block_for_availability`](Self::block_for_availability).
    ///
    /// The wait runs on tokio's blocking pool so the async runtime is not stalled.
    pub async fn block_for_availability_async(self: &Arc<Self>) -> usize {
        if self.is_shutdown() {
            return 0;
        }
        let launcher = Arc::clone(self);
        match tokio::task::spawn_blocking(move || launcher.block_for_availability()).await {
            Ok(hint) => hint,
            Err(e) => {
                error!(launcher_id = %self.id, error = %e, "availability wait failed");
                0
            }
        }
    }

    /// Async [`shutdown`](Self::shutdown), draining on tokio's blocking pool.
    pub async fn shutdown_async(self: &Arc<Self>, wait_for_completion: bool) {
        let launcher = Arc::clone(self);
        if let Err(e) =
            tokio::task::spawn_blocking(move || launcher.shutdown(wait_for_completion)).await
        {
            error!(launcher_id = %self.id, error = %e, "shutdown wait failed");
        }
    }
}

impl<S> fmt::Debug for BoundedLauncher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedLauncher")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("state", &LauncherState::from_u8(self.state.load(Ordering::Acquire)))
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
