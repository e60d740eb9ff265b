//! Tests for configuration validation

use std::collections::HashMap;

use prometheus_launch_gate::config::{LauncherConfig, CAPACITY_ENV, NAME_ENV, STACK_SIZE_ENV};
use prometheus_launch_gate::core::{DEFAULT_CAPACITY, DEFAULT_NAME, DEFAULT_STACK_SIZE};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_config_is_valid() {
    let config = LauncherConfig::default();
    assert_eq!(config.capacity, DEFAULT_CAPACITY);
    assert_eq!(config.name, DEFAULT_NAME);
    assert_eq!(config.stack_size, DEFAULT_STACK_SIZE);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_invalid_capacity() {
    let invalid = LauncherConfig::new().with_capacity(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_invalid_name() {
    let invalid = LauncherConfig::new().with_name("  ");
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_invalid_stack_size() {
    let invalid = LauncherConfig::new().with_stack_size(1024);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "name": "quartz",
        "capacity": 3
    }"#;

    let config = LauncherConfig::from_json_str(json).expect("valid config");
    assert_eq!(config.name, "quartz");
    assert_eq!(config.capacity, 3);
    assert_eq!(config.stack_size, DEFAULT_STACK_SIZE);
}

#[test]
fn test_config_from_json_rejects_zero_capacity() {
    let err = LauncherConfig::from_json_str(r#"{ "capacity": 0 }"#).unwrap_err();
    assert!(err.contains("capacity"));
}

#[test]
fn test_config_from_json_parse_error() {
    let err = LauncherConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_config_from_lookup() {
    let config = LauncherConfig::from_lookup(lookup(&[
        (NAME_ENV, "env-launcher"),
        (CAPACITY_ENV, " 42 "),
        (STACK_SIZE_ENV, "65536"),
    ]))
    .expect("valid env config");

    assert_eq!(config.name, "env-launcher");
    assert_eq!(config.capacity, 42);
    assert_eq!(config.stack_size, 65_536);
}

#[test]
fn test_config_from_lookup_defaults() {
    let config = LauncherConfig::from_lookup(lookup(&[])).expect("defaults");
    assert_eq!(config, LauncherConfig::default());
}

#[test]
fn test_config_from_lookup_bad_number() {
    let err = LauncherConfig::from_lookup(lookup(&[(CAPACITY_ENV, "many")])).unwrap_err();
    assert!(err.to_string().contains(CAPACITY_ENV));
}

#[test]
fn test_config_from_lookup_zero_capacity() {
    assert!(LauncherConfig::from_lookup(lookup(&[(CAPACITY_ENV, "0")])).is_err());
}

#[test]
fn test_config_from_env_file_and_process_env() {
    let path = std::env::temp_dir().join(format!("launch-gate-{}.env", uuid::Uuid::new_v4()));
    std::fs::write(
        &path,
        format!("{NAME_ENV}=from-file\n{CAPACITY_ENV}=12\n"),
    )
    .expect("write env file");

    let config = LauncherConfig::from_env_file(&path).expect("file config");
    assert_eq!(config.name, "from-file");
    assert_eq!(config.capacity, 12);
    assert_eq!(config.stack_size, DEFAULT_STACK_SIZE);

    // Only this test touches these variables.
    std::env::set_var(CAPACITY_ENV, "24");
    let from_file = LauncherConfig::from_env_file(&path);
    let from_env = LauncherConfig::from_env();
    std::env::remove_var(CAPACITY_ENV);
    std::fs::remove_file(&path).expect("remove env file");

    let from_file = from_file.expect("file config");
    assert_eq!(from_file.name, "from-file");
    assert_eq!(from_file.capacity, 24);

    let from_env = from_env.expect("env config");
    assert_eq!(from_env.name, DEFAULT_NAME);
    assert_eq!(from_env.capacity, 24);
}

#[test]
fn test_config_from_missing_env_file() {
    let err = LauncherConfig::from_env_file("/nonexistent/launch-gate.env").unwrap_err();
    assert!(err.to_string().contains("failed to open"));
}
