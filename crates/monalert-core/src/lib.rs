//! monalert-core: shared vocabulary of the metrics pipeline.
//!
//! The agent and the server agree on three things defined here:
//! the closed set of metric kinds, the validated sample that flows from
//! the collector to the store, and the JSON object used both on the wire
//! and inside the snapshot file.

pub mod config;
pub mod error;
pub mod types;
pub mod wire;

pub use config::{EnvSource, ProcessEnv};
pub use error::{ConfigError, ValidationError};
pub use types::*;
pub use wire::Metrics;
