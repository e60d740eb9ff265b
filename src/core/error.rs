//! Error types for launcher configuration and lifecycle.

use thiserror::Error;

/// Errors produced while configuring or starting a launcher.
///
/// None of these can be recovered mid-lifecycle: a caller that hits one has to
/// build a fresh launcher before first use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Capacity must be a positive number of permits.
    #[error("capacity must be greater than 0")]
    InvalidCapacity,
    /// The admission gate already exists; capacity and spawner are frozen.
    #[error("launcher already started")]
    AlreadyStarted,
    /// The launcher was shut down before it was started.
    #[error("launcher has been shut down")]
    ShutDown,
    /// The spawner cannot run `capacity` jobs at once.
    #[error("capacity {capacity} exceeds the spawner's limit of {limit} concurrent units")]
    UnitLimitExceeded {
        /// Requested concurrency cap.
        capacity: usize,
        /// Most units the spawner can run at once.
        limit: usize,
    },
    /// Configuration values failed validation or could not be parsed.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
