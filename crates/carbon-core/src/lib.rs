pub mod config;
pub mod duration;
pub mod error;
pub mod snapshot;

pub use config::{CarbonConfig, DEFAULT_PERCENTILES, ExportConfig};
pub use duration::parse_duration;
pub use error::{ConfigError, ConfigResult};
pub use snapshot::*;
