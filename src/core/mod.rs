//! Admission control: the gate, the launcher built on it, and their ports.

pub mod error;
pub mod gate;
pub mod launcher;
pub mod runner;
pub mod spawn;
pub mod stats;

pub use error::{AppResult, ConfigurationError};
pub use gate::{AdmissionGate, Permit};
pub use launcher::{
    BoundedLauncher, LauncherState, Rejected, Rejection, DEFAULT_CAPACITY, DEFAULT_NAME,
};
pub use runner::{TaskRunner, UnboundedLauncher};
pub use spawn::{Job, PanicHandler, Spawn, ThreadSpawner, DEFAULT_STACK_SIZE};
pub use stats::LauncherStats;
