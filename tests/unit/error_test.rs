//! Tests for error types

use prometheus_launch_gate::core::{ConfigurationError, Rejection};

#[test]
fn test_invalid_capacity_error() {
    let err = ConfigurationError::InvalidCapacity;
    assert_eq!(format!("{}", err), "capacity must be greater than 0");
}

#[test]
fn test_already_started_error() {
    let err = ConfigurationError::AlreadyStarted;
    assert_eq!(format!("{}", err), "launcher already started");
}

#[test]
fn test_shut_down_error() {
    let err = ConfigurationError::ShutDown;
    assert_eq!(format!("{}", err), "launcher has been shut down");
}

#[test]
fn test_unit_limit_exceeded_error() {
    let err = ConfigurationError::UnitLimitExceeded {
        capacity: 10_000,
        limit: 512,
    };
    assert_eq!(
        format!("{}", err),
        "capacity 10000 exceeds the spawner's limit of 512 concurrent units"
    );
}

#[test]
fn test_invalid_config_error() {
    let err = ConfigurationError::Invalid("capacity must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: capacity must be greater than 0"
    );
}

#[test]
fn test_rejection_display() {
    assert_eq!(Rejection::AtCapacity.to_string(), "launcher at capacity");
    assert_eq!(Rejection::ShutDown.to_string(), "launcher is shut down");
    assert_eq!(
        Rejection::SpawnFailed.to_string(),
        "execution unit could not be spawned"
    );
}
