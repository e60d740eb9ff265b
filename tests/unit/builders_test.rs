//! Tests for builder modules

use std::io;

use prometheus_launch_gate::builders::{build_launcher, build_launcher_with};
use prometheus_launch_gate::config::LauncherConfig;
use prometheus_launch_gate::core::{ConfigurationError, Job, LauncherState};

#[test]
fn test_build_launcher_starts() {
    let config = LauncherConfig::new().with_name("built").with_capacity(4);

    let launcher = build_launcher(&config).expect("launcher");
    assert_eq!(launcher.name(), "built");
    assert_eq!(launcher.capacity(), 4);
    assert_eq!(launcher.state(), LauncherState::Running);

    assert!(launcher.launch(|| {}));
    launcher.shutdown(true);
    assert_eq!(launcher.state(), LauncherState::Drained);
}

#[test]
fn test_build_launcher_applies_stack_size() {
    let config = LauncherConfig::new()
        .with_name("stacked")
        .with_stack_size(512 * 1024);

    let launcher = build_launcher(&config).expect("launcher");
    assert_eq!(launcher.spawner().stack_size(), 512 * 1024);
    assert_eq!(launcher.spawner().prefix(), "stacked-unit-");
    launcher.shutdown(true);
}

#[test]
fn test_build_launcher_rejects_invalid_config() {
    let config = LauncherConfig::new().with_capacity(0);
    match build_launcher(&config) {
        Err(ConfigurationError::Invalid(msg)) => assert!(msg.contains("capacity")),
        other => panic!("expected invalid config, got {other:?}"),
    }
}

#[test]
fn test_build_launcher_with_inline_spawner() {
    let inline = |job: Job| -> io::Result<()> {
        job();
        Ok(())
    };
    let config = LauncherConfig::new().with_name("inline").with_capacity(1);
    let mut launcher = build_launcher_with(&config, inline).expect("launcher");

    // Inline units finish before `launch` returns, so the permit is already back.
    assert!(launcher.launch(|| {}));
    assert!(launcher.launch(|| {}));
    assert_eq!(launcher.stats().completed, 2);
    assert_eq!(launcher.configure(2), Err(ConfigurationError::AlreadyStarted));
}
