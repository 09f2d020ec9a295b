//! Error types for the metric store and snapshot persistence.

use std::path::PathBuf;

use monalert_core::{MetricKind, ValidationError};
use thiserror::Error;

/// Result type alias for store and durability operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur in the store or while persisting it.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("metric not found: {kind}/{name}")]
    NotFound { kind: MetricKind, name: String },

    #[error("counter {name} would overflow: {current} + {delta}")]
    CounterOverflow {
        name: String,
        current: i64,
        delta: i64,
    },

    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot decode error at {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("snapshot encode error: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("invalid snapshot record {index}: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: ValidationError,
    },
}
