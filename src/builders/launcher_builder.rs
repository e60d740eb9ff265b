//! Build started launchers from configuration.

use crate::config::LauncherConfig;
use crate::core::{BoundedLauncher, ConfigurationError, Spawn, ThreadSpawner};

/// Build and start a launcher whose units are named OS threads.
///
/// Units are named `{name}-unit-{n}` and use the configured stack size.
///
/// # Errors
///
/// Returns `ConfigurationError::Invalid` if the configuration fails validation.
pub fn build_launcher(
    cfg: &LauncherConfig,
) -> Result<BoundedLauncher<ThreadSpawner>, ConfigurationError> {
    let spawner =
        ThreadSpawner::new(format!("{}-unit-", cfg.name)).with_stack_size(cfg.stack_size);
    build_launcher_with(cfg, spawner)
}

/// Build and start a launcher that starts units through `spawner`.
///
/// # Errors
///
/// Returns `ConfigurationError::Invalid` if the configuration fails validation.
pub fn build_launcher_with<S: Spawn>(
    cfg: &LauncherConfig,
    spawner: S,
) -> Result<BoundedLauncher<S>, ConfigurationError> {
    cfg.validate().map_err(ConfigurationError::Invalid)?;

    let mut launcher = BoundedLauncher::with_spawner(cfg.name.clone(), spawner);
    launcher.configure(cfg.capacity)?;
    launcher.start()?;
    Ok(launcher)
}
