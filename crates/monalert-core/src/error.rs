//! Error types shared by the agent and the server.

use thiserror::Error;

/// A metric update or query that cannot reach the store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unsupported metric kind: {0:?}")]
    UnsupportedKind(String),

    #[error("metric name must not be empty")]
    EmptyName,

    #[error("invalid gauge value: {0:?}")]
    InvalidGauge(String),

    #[error("gauge value must be finite, got {0}")]
    NonFiniteGauge(f64),

    #[error("invalid counter delta: {0:?}")]
    InvalidCounter(String),

    #[error("missing {field} for {kind} metric")]
    MissingValue { kind: &'static str, field: &'static str },

    #[error("incomplete metric path: value segment is missing")]
    IncompletePath,
}

/// Startup configuration that cannot be resolved.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {source_name}: {reason}")]
    Invalid {
        source_name: String,
        value: String,
        reason: String,
    },
}
