//! Signal export: CSV rows for review tools, JSON reports for round-tripping.
//!
//! File names carry the output range and the first 12 hex digits of the
//! parameter fingerprint, so two scans over the same dates with different
//! thresholds never overwrite each other.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use backside_core::domain::Signal;
use backside_core::params::OutputRange;

use crate::config::ExportFormat;
use crate::runner::{ScanReport, SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unsupported schema version {found} (max supported: {max})")]
    SchemaVersion { found: u32, max: u32 },

    #[error("CSV output is not valid UTF-8")]
    Utf8,
}

const FINGERPRINT_PREFIX: usize = 12;

/// `backside_{start}_{end}_{fingerprint prefix}.{ext}`
pub fn export_filename(range: &OutputRange, fingerprint: &str, extension: &str) -> String {
    let prefix: String = fingerprint.chars().take(FINGERPRINT_PREFIX).collect();
    format!(
        "backside_{}_{}_{}.{}",
        range.start.format("%Y%m%d"),
        range.end.format("%Y%m%d"),
        prefix,
        extension
    )
}

fn opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(String::new, |v| format!("{v:.precision$}"))
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per signal.
///
/// Columns: ticker, date, trigger, position, d1_body_over_atr, d1_volume,
/// d1_volume_ratio, volume_signal_max, gap_over_atr, open_above_prev_high,
/// open_over_ema9, d1_high_above_d2, d1_close_above_d2, slope9_5d,
/// high_over_ema9_atr_trigger, dollar_vol_avg20, close, volume
pub fn signals_to_csv(signals: &[Signal]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "ticker",
        "date",
        "trigger",
        "position",
        "d1_body_over_atr",
        "d1_volume",
        "d1_volume_ratio",
        "volume_signal_max",
        "gap_over_atr",
        "open_above_prev_high",
        "open_over_ema9",
        "d1_high_above_d2",
        "d1_close_above_d2",
        "slope9_5d",
        "high_over_ema9_atr_trigger",
        "dollar_vol_avg20",
        "close",
        "volume",
    ])?;

    for s in signals {
        let m = &s.metrics;
        let record: [String; 18] = [
            s.ticker.clone(),
            s.date.to_string(),
            s.trigger.to_string(),
            format!("{:.4}", m.position),
            format!("{:.4}", m.d1_body_over_atr),
            m.d1_volume.to_string(),
            opt(m.d1_volume_ratio, 4),
            opt(m.volume_signal_max, 4),
            format!("{:.4}", m.gap_over_atr),
            m.open_above_prev_high.to_string(),
            format!("{:.4}", m.open_over_ema9),
            m.d1_high_above_d2.to_string(),
            m.d1_close_above_d2.to_string(),
            opt(m.slope9_5d, 4),
            format!("{:.4}", m.high_over_ema9_atr_trigger),
            opt(m.dollar_vol_avg20, 0),
            format!("{:.4}", m.close),
            m.volume.to_string(),
        ];
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().map_err(|e| ExportError::Csv(e.into_error().into()))?;
    String::from_utf8(data).map_err(|_| ExportError::Utf8)
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn report_to_json(report: &ScanReport) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Parse a report, rejecting schema versions newer than this build.
pub fn report_from_json(json: &str) -> Result<ScanReport, ExportError> {
    let report: ScanReport = serde_json::from_str(json)?;
    if report.schema_version > SCHEMA_VERSION {
        return Err(ExportError::SchemaVersion {
            found: report.schema_version,
            max: SCHEMA_VERSION,
        });
    }
    Ok(report)
}

// ─── Files ──────────────────────────────────────────────────────────

fn write_file(path: PathBuf, contents: &str) -> Result<PathBuf, ExportError> {
    std::fs::write(&path, contents).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Write the report in `format` under `dir`, creating it if needed.
/// Returns the paths written.
pub fn write_report(
    report: &ScanReport,
    dir: &Path,
    format: ExportFormat,
) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let range = report.output_range();
    let mut written = Vec::new();
    if format.wants_csv() {
        let name = export_filename(&range, &report.params_fingerprint, "csv");
        written.push(write_file(dir.join(name), &signals_to_csv(&report.signals)?)?);
    }
    if format.wants_json() {
        let name = export_filename(&range, &report.params_fingerprint, "json");
        written.push(write_file(dir.join(name), &report_to_json(report)?)?);
    }

    for path in &written {
        info!(path = %path.display(), signals = report.signals.len(), "wrote scan export");
    }
    Ok(written)
}
