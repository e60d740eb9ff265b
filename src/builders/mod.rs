//! Builders to construct launchers from configuration.

pub mod launcher_builder;

pub use launcher_builder::{build_launcher, build_launcher_with};
