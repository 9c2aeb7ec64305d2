//! Serializable scan configuration.
//!
//! A scan is fully described by one TOML file:
//!
//! ```toml
//! [scan]
//! start = "2024-06-03"
//! end = "2024-06-28"
//!
//! [params]
//! price_min = 8.0
//! trigger_mode = "D1_or_D2"
//!
//! [provider]
//! kind = "polygon"
//! api_key_env = "POLYGON_API_KEY"
//!
//! [calendar]
//! extra_closures = ["2025-01-09"]
//!
//! [concurrency]
//! fetch_workers = 5
//! detect_workers = 10
//!
//! [output]
//! dir = "results"
//! format = "both"
//! ```
//!
//! Every section except `[scan]` is optional and falls back to defaults.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use backside_core::params::{OutputRange, ParamError, ScanParameters};
use backside_core::pipeline::{DEFAULT_DETECT_WORKERS, DEFAULT_FETCH_WORKERS};

/// Content-addressable identifier of a scan configuration.
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Params(#[from] ParamError),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to serialize config: {0}")]
    Serialize(String),
}

/// Complete, reproducible description of one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub scan: ScanWindow,
    #[serde(default)]
    pub params: ScanParameters,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Output date range (inclusive on both ends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Where bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Grouped-daily HTTP endpoint. The API key is read from the named
    /// environment variable at run time and never stored in the config.
    Polygon {
        #[serde(default = "default_base_url")]
        base_url: String,
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
        #[serde(default = "default_max_retries")]
        max_retries: u32,
    },

    /// Seeded random-walk universe, no network.
    Synthetic {
        #[serde(default = "default_seed")]
        seed: u64,
        #[serde(default = "default_universe")]
        tickers: usize,
    },
}

fn default_base_url() -> String {
    backside_core::data::polygon::DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    "POLYGON_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

/// Upper bound for `max_retries` on the HTTP provider.
pub const MAX_RETRIES_LIMIT: u32 = 10;

fn default_seed() -> u64 {
    42
}

fn default_universe() -> usize {
    200
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Polygon {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl ProviderConfig {
    pub fn synthetic(seed: u64, tickers: usize) -> Self {
        ProviderConfig::Synthetic { seed, tickers }
    }
}

/// Closures on top of the built-in holiday rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub extra_closures: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub fetch_workers: usize,
    pub detect_workers: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            fetch_workers: DEFAULT_FETCH_WORKERS,
            detect_workers: DEFAULT_DETECT_WORKERS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Both,
}

impl ExportFormat {
    pub fn wants_csv(&self) -> bool {
        matches!(self, ExportFormat::Csv | ExportFormat::Both)
    }

    pub fn wants_json(&self) -> bool {
        matches!(self, ExportFormat::Json | ExportFormat::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub format: ExportFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
            format: ExportFormat::Csv,
        }
    }
}

impl ScanConfig {
    /// Config for `[start, end]` with every other section at its default.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            scan: ScanWindow { start, end },
            params: ScanParameters::default(),
            provider: ProviderConfig::default(),
            calendar: CalendarConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            output: OutputConfig::default(),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.params.validate()?;
        self.output_range()?;
        if self.concurrency.fetch_workers == 0 || self.concurrency.detect_workers == 0 {
            return Err(ConfigError::Invalid(
                "worker counts must be at least 1".into(),
            ));
        }
        if let ProviderConfig::Synthetic { tickers: 0, .. } = self.provider {
            return Err(ConfigError::Invalid(
                "synthetic universe must contain at least one ticker".into(),
            ));
        }
        if let ProviderConfig::Polygon { max_retries, .. } = self.provider {
            if max_retries > MAX_RETRIES_LIMIT {
                return Err(ConfigError::Invalid(format!(
                    "max_retries {max_retries} exceeds {MAX_RETRIES_LIMIT}"
                )));
            }
        }
        Ok(())
    }

    pub fn output_range(&self) -> Result<OutputRange, ConfigError> {
        Ok(OutputRange::new(self.scan.start, self.scan.end)?)
    }

    /// Deterministic hash of everything that affects the scan's signals.
    ///
    /// Output location and worker counts are excluded: they change where and
    /// how fast results appear, never what they are.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        #[derive(Serialize)]
        struct Identity<'a> {
            scan: &'a ScanWindow,
            params: &'a ScanParameters,
            provider: &'a ProviderConfig,
            calendar: &'a CalendarConfig,
        }
        let json = serde_json::to_string(&Identity {
            scan: &self.scan,
            params: &self.params,
            provider: &self.provider,
            calendar: &self.calendar,
        })
        .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
