//! Serializable analysis configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crosslab_core::DetectorParams;

/// Errors from loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Full configuration for one analysis run.
///
/// ```toml
/// [settings]
/// from_date = "2020-01-01"
/// to_date = "2024-12-31"
/// base_history_path = "data/history"
/// results_dir = "results"
///
/// [detector]
/// ema_span = 50
/// volume_window = 20
/// volume_mult = 1.2
/// breakout_threshold = 0.005
///
/// [report]
/// recent_window = 50
/// parallel = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    pub settings: Settings,

    #[serde(default)]
    pub detector: DetectorParams,

    #[serde(default)]
    pub report: ReportConfig,
}

/// Where history comes from and where results go.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub base_history_path: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

/// Portfolio-level reporting options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Number of trailing bars scanned for the cross-portfolio report.
    pub recent_window: usize,
    /// Analyze instruments on the rayon pool.
    pub parallel: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            recent_window: 50,
            parallel: true,
        }
    }
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

impl AnalysisConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settings.from_date > self.settings.to_date {
            return Err(ConfigError::Invalid(format!(
                "from_date {} is after to_date {}",
                self.settings.from_date, self.settings.to_date
            )));
        }
        if self.report.recent_window == 0 {
            return Err(ConfigError::Invalid("recent_window must be >= 1".into()));
        }
        self.detector
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Directory holding `<SYMBOL>_historical.csv` files for the date range.
    pub fn history_dir(&self) -> PathBuf {
        self.settings.base_history_path.join(format!(
            "{}_{}",
            self.settings.from_date.format("%Y-%m-%d"),
            self.settings.to_date.format("%Y-%m-%d")
        ))
    }

    /// Deterministic BLAKE3 hash of the configuration.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
