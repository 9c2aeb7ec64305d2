//! Per-ticker detection: Stage 3a features followed by the Stage 3b
//! candidate walk.

use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;

use super::gates::{passes_in_order, Candidate, Gate};
use super::mold::find_trigger;
use super::position::absolute_position;
use crate::domain::{Signal, SignalMetrics, TickerSeries, TriggerTag};
use crate::features::{compute_full_features, FullFeatureRow};
use crate::params::{OutputRange, ScanParameters};

/// Tickers with fewer retained rows are skipped entirely.
pub const MIN_SERIES_ROWS: usize = 100;

#[derive(Debug, Error, PartialEq)]
pub enum DetectError {
    #[error("{ticker}: {rows} rows retained, need at least {MIN_SERIES_ROWS}")]
    InsufficientHistory { ticker: String, rows: usize },

    #[error("{ticker}: bars out of date order at row {index}")]
    Unordered { ticker: String, index: usize },

    #[error("{ticker}: detection panicked: {message}")]
    Panicked { ticker: String, message: String },
}

impl DetectError {
    /// Expected skips (short history) as opposed to data defects.
    pub fn is_expected(&self) -> bool {
        matches!(self, DetectError::InsufficientHistory { .. })
    }
}

/// Run detection for one ticker's retained series.
pub fn detect_ticker(
    series: &TickerSeries,
    range: &OutputRange,
    params: &ScanParameters,
) -> Result<Vec<Signal>, DetectError> {
    if series.len() < MIN_SERIES_ROWS {
        return Err(DetectError::InsufficientHistory {
            ticker: series.ticker.clone(),
            rows: series.len(),
        });
    }
    if let Some(index) = series.bars.windows(2).position(|w| w[0].date >= w[1].date) {
        return Err(DetectError::Unordered {
            ticker: series.ticker.clone(),
            index: index + 1,
        });
    }

    let rows = compute_full_features(series);
    Ok(scan_rows(&series.ticker, &rows, range, params))
}

/// Run `detect` for `ticker`, turning a panic into `DetectError::Panicked`
/// so one bad series cannot take down the whole detect pool.
pub fn detect_isolated<F>(ticker: &str, detect: F) -> Result<Vec<Signal>, DetectError>
where
    F: FnOnce() -> Result<Vec<Signal>, DetectError>,
{
    catch_unwind(AssertUnwindSafe(detect)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Err(DetectError::Panicked {
            ticker: ticker.to_string(),
            message,
        })
    })
}

/// Walk every D0 candidate in the output range.
pub fn scan_rows(
    ticker: &str,
    rows: &[FullFeatureRow],
    range: &OutputRange,
    params: &ScanParameters,
) -> Vec<Signal> {
    (2..rows.len())
        .filter(|&i| range.contains(rows[i].bar.date))
        .filter_map(|i| evaluate_at(ticker, rows, i, params))
        .collect()
}

/// Evaluate the candidate with D0 at `i`.
pub fn evaluate_at(
    ticker: &str,
    rows: &[FullFeatureRow],
    i: usize,
    params: &ScanParameters,
) -> Option<Signal> {
    let position = absolute_position(rows, i, params);
    let candidate = Candidate::at(rows, i, position)?;
    if !passes_in_order(&candidate, params, &Gate::ALL) {
        return None;
    }
    let trigger = find_trigger(candidate.d1, candidate.d2, params)?;
    Some(build_signal(ticker, &candidate, trigger))
}

fn build_signal(ticker: &str, c: &Candidate<'_>, trigger: TriggerTag) -> Signal {
    let trigger_row = match trigger {
        TriggerTag::DMinus1 => c.d1,
        TriggerTag::DMinus2 => c.d2,
    };
    let volume_signal_max = match (c.d1.volume_ratio(), c.d2.volume_ratio()) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };

    // Gates guarantee the plain fields below; defaults are unreachable.
    Signal {
        ticker: ticker.to_string(),
        date: c.d0.bar.date,
        trigger,
        metrics: SignalMetrics {
            position: c.position.unwrap_or_default(),
            d1_body_over_atr: c.d1.body_over_atr.unwrap_or_default(),
            d1_volume: c.d1.bar.volume,
            d1_volume_ratio: c.d1.volume_ratio(),
            volume_signal_max,
            gap_over_atr: c.d0.gap_over_atr.unwrap_or_default(),
            open_above_prev_high: c.d1.prev_high.is_some_and(|h| c.d0.bar.open > h),
            open_over_ema9: c.d0.open_over_ema9.unwrap_or_default(),
            d1_high_above_d2: c.d1.bar.high > c.d2.bar.high,
            d1_close_above_d2: c.d1.bar.close > c.d2.bar.close,
            slope9_5d: c.d0.slope9_5d,
            high_over_ema9_atr_trigger: trigger_row.high_over_ema9_div_atr.unwrap_or_default(),
            dollar_vol_avg20: c.d0.dollar_vol_avg20,
            close: c.d0.bar.close,
            volume: c.d0.bar.volume,
        },
    }
}
