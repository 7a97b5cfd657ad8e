//! Error types.
//!
//! Only boundary-facing operations (dataset fetch/extend, configuration
//! loading) return errors. Internal pipeline stages degrade to empty or
//! neutral results instead.

use thiserror::Error;

/// Malformed or unsupported generation parameters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
    #[error("sample count must not be negative (got {0})")]
    NegativeCount(i64),

    #[error("sample count {requested} exceeds the maximum of {max}")]
    CountTooLarge { requested: u64, max: usize },

    #[error("volatility must be a finite, non-negative number (got {0})")]
    InvalidVolatility(f64),

    #[error("{name} must be a finite number (got {value})")]
    NonFinite { name: &'static str, value: f64 },
}

/// Failure to load or validate a [`StreamConfig`](crate::StreamConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Generator(#[from] GenerationError),
}
