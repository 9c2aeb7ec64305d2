//! Scan runner: turns a `ScanConfig` into a provider, a calendar and a
//! finished `ScanReport`.
//!
//! Two entry points:
//! - `run_scan()`: executes the three stages and returns the report.
//! - `run_and_export()`: same, then writes the configured output files.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use backside_core::data::{
    CircuitBreaker, DataError, MarketDataProvider, PolygonGroupedProvider, PolygonSettings,
    SyntheticProvider, SyntheticUniverse, UsEquityCalendar,
};
use backside_core::domain::Signal;
use backside_core::observe::ScanObserver;
use backside_core::params::{OutputRange, ScanParameters};
use backside_core::pipeline::{ScanError, ScanStats, Scanner};

use crate::config::{ConfigError, ProviderConfig, RunId, ScanConfig};
use crate::export::{write_report, ExportError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
    #[error("environment variable {var} is not set; it must hold the provider API key")]
    MissingApiKey { var: String },
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    /// BLAKE3 of the scan parameters alone.
    pub params_fingerprint: String,
    pub provider: String,
    pub output_start: NaiveDate,
    pub output_end: NaiveDate,
    pub params: ScanParameters,
    pub signals: Vec<Signal>,
    pub stats: ScanStats,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl ScanReport {
    pub fn output_range(&self) -> OutputRange {
        OutputRange {
            start: self.output_start,
            end: self.output_end,
        }
    }
}

/// Build the provider named by the config.
///
/// The synthetic universe spans exactly the ingestion window, so every
/// requested trading day has bars.
pub fn build_provider(config: &ScanConfig) -> Result<Box<dyn MarketDataProvider>, RunError> {
    match &config.provider {
        ProviderConfig::Polygon {
            base_url,
            api_key_env,
            timeout_secs,
            max_retries,
        } => {
            let api_key = std::env::var(api_key_env)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| RunError::MissingApiKey {
                    var: api_key_env.clone(),
                })?;
            let settings = PolygonSettings {
                base_url: base_url.clone(),
                timeout: Duration::from_secs(*timeout_secs),
                max_retries: *max_retries,
                ..PolygonSettings::new(api_key)
            };
            let provider =
                PolygonGroupedProvider::new(settings, Arc::new(CircuitBreaker::for_scan()))?;
            Ok(Box::new(provider))
        }
        ProviderConfig::Synthetic { seed, tickers } => {
            let range = config.output_range()?;
            Ok(Box::new(SyntheticProvider::new(&SyntheticUniverse {
                seed: *seed,
                tickers: *tickers,
                start: range.data_start(&config.params),
                end: range.end,
            })))
        }
    }
}

/// Run a scan end to end and return its report.
pub fn run_scan(config: &ScanConfig, observer: &dyn ScanObserver) -> Result<ScanReport, RunError> {
    config.validate()?;
    let range = config.output_range()?;
    let run_id = config.run_id()?;
    let params_fingerprint = config.params.fingerprint().map_err(ConfigError::from)?;

    let provider = build_provider(config)?;
    let calendar = UsEquityCalendar::with_closures(config.calendar.extra_closures.iter().copied());
    info!(
        run_id = %run_id,
        provider = provider.name(),
        fetch_workers = config.concurrency.fetch_workers,
        detect_workers = config.concurrency.detect_workers,
        "starting scan run"
    );

    let outcome = Scanner::new(provider.as_ref(), &calendar)
        .with_observer(observer)
        .with_workers(
            config.concurrency.fetch_workers,
            config.concurrency.detect_workers,
        )
        .run(&config.params, &range)?;

    if !outcome.stats.ingest.all_succeeded() {
        warn!(
            failed = outcome.stats.ingest.days_failed,
            requested = outcome.stats.ingest.days_requested,
            "scan completed with missing days"
        );
    }

    Ok(ScanReport {
        schema_version: SCHEMA_VERSION,
        run_id,
        params_fingerprint,
        provider: provider.name().to_string(),
        output_start: range.start,
        output_end: range.end,
        params: config.params.clone(),
        signals: outcome.signals,
        stats: outcome.stats,
    })
}

/// Run a scan and write its report to `config.output`.
pub fn run_and_export(
    config: &ScanConfig,
    observer: &dyn ScanObserver,
) -> Result<(ScanReport, Vec<PathBuf>), RunError> {
    let report = run_scan(config, observer)?;
    let written = write_report(&report, &config.output.dir, config.output.format)?;
    Ok((report, written))
}
