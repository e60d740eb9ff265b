//! Admission gate: the permit store behind `BoundedLauncher`.
//!
//! The gate is a counting semaphore with two extra blocking primitives:
//!
//! - [`AdmissionGate::block_until_available`] waits for *any* capacity and
//!   returns a hint, without reserving a permit.
//! - [`AdmissionGate::wait_for_drain`] waits until every permit is back and no
//!   caller is still probing for capacity.
//!
//! # Design
//!
//! - **Lock-free fast path**: `try_acquire` and `release` are CAS loops on a
//!   single `AtomicUsize`.
//! - **Level-triggered wake-up**: a release broadcasts on a `parking_lot`
//!   `Condvar` and woken threads race through `try_acquire`. There is no
//!   per-waiter hand-off and no fairness.
//! - **Mutex only when parked**: `release` touches the mutex only if some
//!   thread is parked, so an uncontended gate never locks.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{error, trace};

/// Bounded permit store with "wait for capacity" and "wait for drain".
///
/// Every successful [`try_acquire`](Self::try_acquire) must be matched by
/// exactly one [`release`](Self::release). The gate cannot tell a leaked
/// permit from a busy one; it only detects the opposite mistake (releasing
/// more than was acquired), which is fatal.
pub struct AdmissionGate {
    capacity: usize,
    available: AtomicUsize,
    /// Callers currently inside `block_until_available`.
    probing: AtomicUsize,
    /// Callers parked (or about to park) on `wake`.
    parked: AtomicUsize,
    lock: Mutex<()>,
    wake: Condvar,
}

impl AdmissionGate {
    /// Create a gate with all `capacity` permits available.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        Self {
            capacity,
            available: AtomicUsize::new(capacity),
            probing: AtomicUsize::new(0),
            parked: AtomicUsize::new(0),
            lock: Mutex::new(()),
            wake: Condvar::new(),
        }
    }

    /// Take one permit if any is available. Never blocks.
    pub fn try_acquire(&self) -> bool {
        let mut current = self.available.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return false;
            }
            match self.available.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Take one permit as a guard that releases it on drop.
    pub fn try_permit(self: &Arc<Self>) -> Option<Permit> {
        self.try_acquire().then(|| Permit {
            gate: Arc::clone(self),
        })
    }

    /// Return one permit and wake every parked caller.
    ///
    /// # Panics
    ///
    /// Panics if the release would push the available count above capacity.
    /// That only happens on a double release or a release without a matching
    /// acquire, and the gate refuses to continue with a corrupt count.
    pub fn release(&self) {
        let mut current = self.available.load(Ordering::Acquire);
        loop {
            if current >= self.capacity {
                error!(
                    capacity = self.capacity,
                    available = current,
                    "permit released without a matching acquire"
                );
                panic!(
                    "admission gate overflow: release would exceed capacity {}",
                    self.capacity
                );
            }
            match self.available.compare_exchange_weak(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        trace!(available = current + 1, "permit released");
        self.wake_parked();
    }

    /// Block until at least one permit is available and return the observed count.
    ///
    /// The result is a hint, not a reservation: it is positive at the instant
    /// of wake-up but another caller may take the permit before this one calls
    /// [`try_acquire`](Self::try_acquire).
    pub fn block_until_available(&self) -> usize {
        self.probing.fetch_add(1, Ordering::SeqCst);
        let observed = self.park_until(|gate| {
            let available = gate.available.load(Ordering::SeqCst);
            (available > 0).then_some(available)
        });
        if self.probing.fetch_sub(1, Ordering::SeqCst) == 1 {
            // A drain waiter may be parked on the last prober leaving.
            self.wake_parked();
        }
        observed
    }

    /// Block until every permit has been released and nobody is probing.
    pub fn wait_for_drain(&self) {
        self.park_until(|gate| gate.is_drained().then_some(()));
    }

    /// Configured number of permits.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently available (racy snapshot).
    #[must_use]
    pub fn available(&self) -> usize {
        self.available.load(Ordering::Acquire)
    }

    /// Permits currently held (racy snapshot).
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }

    /// Callers currently inside `block_until_available` (racy snapshot).
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.probing.load(Ordering::Acquire)
    }

    fn is_drained(&self) -> bool {
        self.available.load(Ordering::SeqCst) == self.capacity
            && self.probing.load(Ordering::SeqCst) == 0
    }

    /// Park on the condvar until `ready` yields a value.
    ///
    /// `parked` is raised before the condition is re-checked under the lock, and
    /// wakers bump their counter before reading `parked` (both `SeqCst`), so a
    /// waker either sees the parked thread or the parked thread sees the update.
    fn park_until<T>(&self, mut ready: impl FnMut(&Self) -> Option<T>) -> T {
        if let Some(value) = ready(self) {
            return value;
        }

        self.parked.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.lock.lock();
        let value = loop {
            if let Some(value) = ready(self) {
                break value;
            }
            self.wake.wait(&mut guard);
        };
        drop(guard);
        self.parked.fetch_sub(1, Ordering::SeqCst);
        value
    }

    fn wake_parked(&self) {
        if self.parked.load(Ordering::SeqCst) > 0 {
            let _guard = self.lock.lock();
            self.wake.notify_all();
        }
    }
}

impl fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .field("waiters", &self.waiters())
            .finish_non_exhaustive()
    }
}

/// One acquired permit. Dropping it releases the permit exactly once.
#[must_use = "dropping a permit releases it immediately"]
pub struct Permit {
    gate: Arc<AdmissionGate>,
}

impl fmt::Debug for Permit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit")
            .field("capacity", &self.gate.capacity)
            .finish()
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.gate.release();
    }
}
