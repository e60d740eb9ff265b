//! Runtime adapters for execution units.

pub mod tokio_spawner;

pub use tokio_spawner::{TokioSpawner, DEFAULT_UNIT_LIMIT};
