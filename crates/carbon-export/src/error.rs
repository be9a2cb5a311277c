//! Error types for the exporter.

use carbon_core::ConfigError;
use thiserror::Error;

/// Result type alias for exporter operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Errors surfaced by the exporter and its registry.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The flush cycle could not reach the carbon server.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid exporter config: {0}")]
    Config(#[from] ConfigError),

    #[error("metric already registered: {0}")]
    DuplicateMetric(String),
}
