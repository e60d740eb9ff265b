//! # Prometheus Launch Gate
//!
//! Bounded admission control for fire-and-forget tasks.
//!
//! This library lets an unbounded number of callers launch short-lived tasks,
//! each on its own cheap execution unit, while never running more than a fixed
//! number at once. It is the concurrency cap behind job schedulers that expect
//! a thread-pool contract ("run this, or tell me you can't") but should not
//! pool their workers.
//!
//! ## Core Problem Solved
//!
//! A plain counting semaphore offers acquire and release. A scheduler loop
//! needs two more things:
//!
//! - **Wait for any capacity**: block until a launch is *likely* to succeed,
//!   without reserving a permit it may not use
//! - **Wait for drain**: on shutdown, know that every admitted task has
//!   released its permit
//!
//! ## Key Features
//!
//! - **Lock-free admission**: `launch` is a CAS on one atomic and never blocks
//! - **Reject, never queue**: a full launcher returns `false`; retrying is the
//!   caller's call
//! - **Guaranteed release**: the permit travels with the task and is released
//!   when it returns or panics
//! - **Graceful shutdown**: one-way flag plus optional drain-wait
//! - **Pluggable execution units**: named OS threads, a tokio blocking pool, or
//!   any `Fn(Job)` closure
//!
//! ## Example
//!
//! ```rust,ignore
//! use prometheus_launch_gate::core::BoundedLauncher;
//!
//! let mut launcher = BoundedLauncher::named("scheduler");
//! launcher.configure(3)?;
//! launcher.start()?;
//!
//! // Retry until admitted (blocks between attempts).
//! launcher.launch_until_admitted(|| println!("running"));
//!
//! // Stop admitting and wait for running tasks.
//! launcher.shutdown(true);
//! ```
//!
//! For complete examples, see:
//! - `tests/launcher_test.rs` - Admission, retry and shutdown scenarios
//! - `tests/gate_test.rs` - Gate invariants under contention

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Admission gate, launchers and execution-unit ports.
pub mod core;
/// Configuration models for launchers.
pub mod config;
/// Builders to construct launchers from configuration.
pub mod builders;
/// Runtime adapters for execution units.
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
/// Shared utilities.
pub mod util;
