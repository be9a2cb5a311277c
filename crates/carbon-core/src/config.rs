//! Exporter configuration: the validated runtime form and the carbon.toml file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::parse_duration;
use crate::error::{ConfigError, ConfigResult};

/// Percentile fractions reported for histograms and timers unless overridden.
pub const DEFAULT_PERCENTILES: [f64; 5] = [0.5, 0.75, 0.95, 0.99, 0.999];

/// Immutable settings for one exporter run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Carbon plaintext listener, as `host:port`.
    pub address: String,
    /// Time between two flush cycles.
    pub flush_interval: Duration,
    /// Unit raw timer durations (nanoseconds) are divided by before emission.
    pub duration_unit: Duration,
    /// Prepended to every metric name.
    pub prefix: String,
    /// Percentile fractions in [0, 1], emitted in this order.
    pub percentiles: Vec<f64>,
}

impl ExportConfig {
    /// Create a config with nanosecond durations and the default percentiles.
    pub fn new(
        address: impl Into<String>,
        flush_interval: Duration,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            flush_interval,
            duration_unit: Duration::from_nanos(1),
            prefix: prefix.into(),
            percentiles: DEFAULT_PERCENTILES.to_vec(),
        }
    }

    pub fn with_duration_unit(mut self, unit: Duration) -> Self {
        self.duration_unit = unit;
        self
    }

    pub fn with_percentiles(mut self, percentiles: Vec<f64>) -> Self {
        self.percentiles = percentiles;
        self
    }

    /// Check the invariants every flush cycle relies on.
    ///
    /// A zero flush interval would make the `count_ps` rates divide by zero,
    /// so it is rejected here rather than at format time.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::MissingAddress);
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::ZeroFlushInterval);
        }
        if self.duration_unit.is_zero() {
            return Err(ConfigError::ZeroDurationUnit);
        }
        if let Some(&p) = self.percentiles.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(ConfigError::PercentileOutOfRange(p));
        }
        Ok(())
    }

    /// Flush interval in (fractional) seconds.
    pub fn flush_seconds(&self) -> f64 {
        self.flush_interval.as_secs_f64()
    }

    /// Duration unit in nanoseconds, saturating at `i64::MAX`.
    pub fn duration_unit_nanos(&self) -> i64 {
        i64::try_from(self.duration_unit.as_nanos()).unwrap_or(i64::MAX)
    }
}

/// The `carbon.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonConfig {
    pub exporter: ExporterSection,
}

/// `[exporter]` table. Durations are strings such as "10s" or "1ms".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterSection {
    pub address: String,
    pub flush_interval: Option<String>,
    pub duration_unit: Option<String>,
    pub prefix: Option<String>,
    pub percentiles: Option<Vec<f64>>,
}

impl CarbonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CarbonConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Resolve the file into a validated [`ExportConfig`].
    ///
    /// Missing fields fall back to a 10s interval, nanosecond durations, an
    /// empty prefix and [`DEFAULT_PERCENTILES`].
    pub fn export_config(&self) -> ConfigResult<ExportConfig> {
        let section = &self.exporter;

        let flush_interval = match section.flush_interval.as_deref() {
            Some(raw) => parse_duration(raw).ok_or_else(|| ConfigError::InvalidDuration {
                field: "flush_interval",
                value: raw.to_string(),
            })?,
            None => Duration::from_secs(10),
        };

        let mut config = ExportConfig::new(
            section.address.clone(),
            flush_interval,
            section.prefix.clone().unwrap_or_default(),
        );

        if let Some(raw) = section.duration_unit.as_deref() {
            let unit = parse_duration(raw).ok_or_else(|| ConfigError::InvalidDuration {
                field: "duration_unit",
                value: raw.to_string(),
            })?;
            config = config.with_duration_unit(unit);
        }
        if let Some(percentiles) = &section.percentiles {
            config = config.with_percentiles(percentiles.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ExportConfig {
        ExportConfig::new("127.0.0.1:2003", Duration::from_secs(10), "app")
    }

    #[test]
    fn new_applies_defaults() {
        let config = valid();
        assert_eq!(config.duration_unit, Duration::from_nanos(1));
        assert_eq!(config.percentiles, DEFAULT_PERCENTILES.to_vec());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_flush_interval_is_rejected() {
        let config = ExportConfig::new("127.0.0.1:2003", Duration::ZERO, "app");
        assert_eq!(config.validate(), Err(ConfigError::ZeroFlushInterval));
    }

    #[test]
    fn zero_duration_unit_is_rejected() {
        let config = valid().with_duration_unit(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroDurationUnit));
    }

    #[test]
    fn percentile_out_of_range_is_rejected() {
        let config = valid().with_percentiles(vec![0.5, 1.5]);
        assert_eq!(config.validate(), Err(ConfigError::PercentileOutOfRange(1.5)));

        let config = valid().with_percentiles(vec![f64::NAN]);
        assert!(matches!(config.validate(), Err(ConfigError::PercentileOutOfRange(_))));
    }

    #[test]
    fn percentile_bounds_are_inclusive() {
        let config = valid().with_percentiles(vec![0.0, 1.0]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_address_is_rejected() {
        let config = ExportConfig::new("  ", Duration::from_secs(1), "app");
        assert_eq!(config.validate(), Err(ConfigError::MissingAddress));
    }

    #[test]
    fn unit_conversions() {
        let config = valid().with_duration_unit(Duration::from_millis(1));
        assert_eq!(config.duration_unit_nanos(), 1_000_000);
        assert_eq!(config.flush_seconds(), 10.0);

        let config = ExportConfig::new("h:1", Duration::from_millis(2500), "");
        assert_eq!(config.flush_seconds(), 2.5);
    }

    #[test]
    fn parse_full_file() {
        let toml_str = r#"
[exporter]
address = "graphite.internal:2003"
flush_interval = "30s"
duration_unit = "1ms"
prefix = "web"
percentiles = [0.5, 0.99]
"#;
        let file: CarbonConfig = toml::from_str(toml_str).unwrap();
        let config = file.export_config().unwrap();
        assert_eq!(config.address, "graphite.internal:2003");
        assert_eq!(config.flush_interval, Duration::from_secs(30));
        assert_eq!(config.duration_unit, Duration::from_millis(1));
        assert_eq!(config.prefix, "web");
        assert_eq!(config.percentiles, vec![0.5, 0.99]);
    }

    #[test]
    fn parse_minimal_file_uses_defaults() {
        let toml_str = r#"
[exporter]
address = "127.0.0.1:2003"
"#;
        let file: CarbonConfig = toml::from_str(toml_str).unwrap();
        let config = file.export_config().unwrap();
        assert_eq!(config.flush_interval, Duration::from_secs(10));
        assert_eq!(config.duration_unit, Duration::from_nanos(1));
        assert_eq!(config.prefix, "");
        assert_eq!(config.percentiles.len(), 5);
    }

    #[test]
    fn bad_duration_names_the_field() {
        let toml_str = r#"
[exporter]
address = "127.0.0.1:2003"
flush_interval = "soon"
"#;
        let file: CarbonConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            file.export_config(),
            Err(ConfigError::InvalidDuration {
                field: "flush_interval",
                value: "soon".to_string(),
            })
        );
    }

    #[test]
    fn zero_interval_in_file_is_rejected() {
        let toml_str = r#"
[exporter]
address = "127.0.0.1:2003"
flush_interval = "0s"
"#;
        let file: CarbonConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(file.export_config(), Err(ConfigError::ZeroFlushInterval));
    }

    #[test]
    fn from_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("carbon.toml");
        std::fs::write(
            &path,
            "[exporter]\naddress = \"127.0.0.1:2003\"\nprefix = \"svc\"\n",
        )
        .unwrap();

        let file = CarbonConfig::from_file(&path).unwrap();
        assert_eq!(file.exporter.prefix.as_deref(), Some("svc"));
        assert!(file.to_toml_string().unwrap().contains("svc"));
    }

    #[test]
    fn from_file_missing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CarbonConfig::from_file(&dir.path().join("nope.toml")).is_err());
    }
}
