//! Configuration models for launchers.

pub mod launcher;

pub use launcher::{LauncherConfig, CAPACITY_ENV, NAME_ENV, STACK_SIZE_ENV};
