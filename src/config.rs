use crate::metrics::{MetricField, MetricRange, MetricRanges};
use crate::profile::ProfileInput;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration loaded from healthboard.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct HealthConfig {
    pub ranges: RangesConfig,
    pub reports: ReportsConfig,
    pub serve: ServeConfig,
    pub profile: Option<ProfileInput>,
}

/// Inclusive validation bounds for bulk-imported metrics.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RangesConfig {
    pub heart_rate: MetricRange,
    pub glucose: MetricRange,
    pub peak_flow: MetricRange,
    pub hba1c: MetricRange,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Samples shown in the "recent" section of a report.
    pub recent_window: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub bind: String,
    pub port: u16,
}

// --- Default implementations ---

impl Default for RangesConfig {
    fn default() -> Self {
        let ranges = MetricRanges::default();
        Self {
            heart_rate: ranges.heart_rate,
            glucose: ranges.glucose,
            peak_flow: ranges.peak_flow,
            hba1c: ranges.hba1c,
        }
    }
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self { recent_window: 7 }
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl RangesConfig {
    pub fn to_ranges(&self) -> MetricRanges {
        MetricRanges {
            heart_rate: self.heart_rate,
            glucose: self.glucose,
            peak_flow: self.peak_flow,
            hba1c: self.hba1c,
        }
    }
}

impl HealthConfig {
    /// Load config from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let config: HealthConfig = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject inverted or non-finite ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ranges = self.ranges.to_ranges();
        for field in MetricField::ALL {
            let range = ranges.get(field);
            if !(range.min.is_finite() && range.max.is_finite() && range.min <= range.max) {
                return Err(ConfigError::InvalidRange { field, range });
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidRange {
        field: MetricField,
        range: MetricRange,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {source}", path.display())
            }
            ConfigError::InvalidRange { field, range } => write!(
                f,
                "invalid range for {field}: min {} must not exceed max {}",
                range.min, range.max
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::InvalidRange { .. } => None,
        }
    }
}
