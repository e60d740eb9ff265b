//! Execution-unit factories.
//!
//! A launcher never runs tasks itself; it hands each admitted task, already
//! wrapped with its permit, to a [`Spawn`] implementation that starts one
//! fresh execution unit for it. Units are created per task and never pooled.

use std::any::Any;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error};

/// A unit of work handed to a spawner.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Callback invoked with the unit name and panic message when a job panics.
pub type PanicHandler = Arc<dyn Fn(&str, &str) + Send + Sync + 'static>;

/// Default stack size for thread-backed execution units.
pub const DEFAULT_STACK_SIZE: usize = 256 * 1024;

/// Abstraction for starting one execution unit per job.
///
/// Implementations must run the job asynchronously and return without
/// waiting for it. If the unit cannot be started the job must simply be
/// dropped; its permit is released by that drop.
pub trait Spawn: Send + Sync + 'static {
    /// Start a new execution unit running `job`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the unit could not be created.
    fn spawn(&self, job: Job) -> io::Result<()>;

    /// Most jobs this spawner can run at the same time, if bounded.
    ///
    /// A launcher refuses to start with a capacity above this limit, since
    /// admitted jobs past it would wait for a unit instead of running.
    fn unit_limit(&self) -> Option<usize> {
        None
    }
}

impl<F> Spawn for F
where
    F: Fn(Job) -> io::Result<()> + Send + Sync + 'static,
{
    fn spawn(&self, job: Job) -> io::Result<()> {
        self(job)
    }
}

/// Spawner that starts one named OS thread per job.
///
/// Threads are named `{prefix}{ordinal}` with the ordinal starting at 1, and
/// use a small stack so that thousands of them stay cheap. Panics are caught
/// at the top of the thread and reported to the panic handler (or logged).
#[derive(Clone)]
pub struct ThreadSpawner {
    prefix: String,
    stack_size: usize,
    ordinal: Arc<AtomicU64>,
    on_panic: Option<PanicHandler>,
}

impl ThreadSpawner {
    /// Create a spawner naming its threads with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            stack_size: DEFAULT_STACK_SIZE,
            ordinal: Arc::new(AtomicU64::new(0)),
            on_panic: None,
        }
    }

    /// Set the stack size of spawned threads.
    #[must_use]
    pub const fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// Install a handler for jobs that panic.
    #[must_use]
    pub fn with_panic_handler<H>(mut self, handler: H) -> Self
    where
        H: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.on_panic = Some(Arc::new(handler));
        self
    }

    /// Thread name prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Stack size of spawned threads.
    #[must_use]
    pub const fn stack_size(&self) -> usize {
        self.stack_size
    }
}

impl Default for ThreadSpawner {
    fn default() -> Self {
        Self::new("launch-unit-")
    }
}

impl fmt::Debug for ThreadSpawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadSpawner")
            .field("prefix", &self.prefix)
            .field("stack_size", &self.stack_size)
            .field("spawned", &self.ordinal.load(Ordering::Relaxed))
            .field("has_panic_handler", &self.on_panic.is_some())
            .finish()
    }
}

impl Spawn for ThreadSpawner {
    fn spawn(&self, job: Job) -> io::Result<()> {
        let ordinal = self.ordinal.fetch_add(1, Ordering::Relaxed) + 1;
        let name = format!("{}{ordinal}", self.prefix);
        let on_panic = self.on_panic.clone();

        // The handle is dropped: units are detached and never joined.
        thread::Builder::new()
            .name(name.clone())
            .stack_size(self.stack_size)
            .spawn(move || run_guarded(&name, job, on_panic.as_deref()))?;
        Ok(())
    }
}

/// Run `job`, catching a panic so it is reported instead of silently killing the unit.
pub(crate) fn run_guarded(
    unit: &str,
    job: Job,
    on_panic: Option<&(dyn Fn(&str, &str) + Send + Sync)>,
) {
    debug!(unit, "execution unit started");
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        let message = panic_message(payload.as_ref());
        match on_panic {
            Some(handler) => handler(unit, &message),
            None => error!(unit, panic = %message, "task panicked"),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
