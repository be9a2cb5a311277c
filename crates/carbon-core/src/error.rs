//! Error types for exporter configuration.

use thiserror::Error;

/// Result type alias for configuration checks.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while building or validating an export configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("flush interval must be positive")]
    ZeroFlushInterval,

    #[error("duration unit must be positive")]
    ZeroDurationUnit,

    #[error("percentile {0} is outside [0, 1]")]
    PercentileOutOfRange(f64),

    #[error("exporter address is empty")]
    MissingAddress,

    #[error("invalid duration for {field}: {value:?}")]
    InvalidDuration { field: &'static str, value: String },
}
