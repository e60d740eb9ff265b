//! Launcher configuration.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{AppResult, DEFAULT_CAPACITY, DEFAULT_NAME, DEFAULT_STACK_SIZE};

/// Environment variable holding the concurrency cap.
pub const CAPACITY_ENV: &str = "LAUNCH_GATE_CAPACITY";
/// Environment variable holding the instance name.
pub const NAME_ENV: &str = "LAUNCH_GATE_NAME";
/// Environment variable holding the execution-unit stack size in bytes.
pub const STACK_SIZE_ENV: &str = "LAUNCH_GATE_STACK_SIZE";

/// Smallest stack size accepted for thread-backed units.
const MIN_STACK_SIZE: usize = 16 * 1024;

/// Configuration for one bounded launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Instance name, used as the execution-unit name prefix.
    pub name: String,
    /// Maximum number of concurrently running tasks.
    pub capacity: usize,
    /// Stack size of thread-backed execution units, in bytes.
    pub stack_size: usize,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            capacity: DEFAULT_CAPACITY,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl LauncherConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the instance name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the concurrency cap.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the execution-unit stack size.
    #[must_use]
    pub const fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be greater than 0".into());
        }
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        if self.stack_size < MIN_STACK_SIZE {
            return Err(format!("stack_size must be at least {MIN_STACK_SIZE} bytes"));
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is read first if present.
    /// Unset variables keep their default values.
    ///
    /// # Errors
    ///
    /// Fails if a variable does not parse or the result does not validate.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from a dotenv-style file, without touching the
    /// process environment.
    ///
    /// Variables already set in the process environment take precedence over
    /// the file, as with [`from_env`](Self::from_env).
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed, or the result does not
    /// validate.
    pub fn from_env_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let file_vars: HashMap<String, String> = dotenvy::from_path_iter(path)
            .with_context(|| format!("failed to open {}", path.display()))?
            .collect::<Result<_, _>>()
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file_vars.get(key).cloned()))
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Fails if a value does not parse or the result does not validate.
    pub fn from_lookup<L>(lookup: L) -> AppResult<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(name) = lookup(NAME_ENV) {
            cfg.name = name;
        }
        if let Some(raw) = lookup(CAPACITY_ENV) {
            cfg.capacity = raw
                .trim()
                .parse()
                .with_context(|| format!("{CAPACITY_ENV} must be a positive integer, got `{raw}`"))?;
        }
        if let Some(raw) = lookup(STACK_SIZE_ENV) {
            cfg.stack_size = raw
                .trim()
                .parse()
                .with_context(|| format!("{STACK_SIZE_ENV} must be a byte count, got `{raw}`"))?;
        }
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}
