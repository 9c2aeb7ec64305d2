//! Absolute position window.
//!
//! Measures how extended D-1's close is against the long-run high/low range
//! of the ticker, ignoring the most recent `exclusion_days` so that the run-up
//! being evaluated does not define its own ceiling.

use chrono::NaiveDate;

use crate::features::FullFeatureRow;
use crate::params::{days_before, ScanParameters};

/// (lo, hi) over rows dated within [cutoff − lookback_days, cutoff], where
/// cutoff = D0 − exclusion_days. `None` if the window holds no usable row or
/// the cutoff falls before the earliest representable date.
pub fn window_bounds(
    rows: &[FullFeatureRow],
    d0: usize,
    params: &ScanParameters,
) -> Option<(f64, f64)> {
    let d0_date = rows.get(d0)?.bar.date;
    let cutoff = days_before(d0_date, params.exclusion_days)?;
    let start = days_before(cutoff, params.lookback_days).unwrap_or(NaiveDate::MIN);

    let from = rows.partition_point(|r| r.bar.date < start);
    let to = rows.partition_point(|r| r.bar.date <= cutoff);
    if from >= to {
        return None;
    }

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for r in &rows[from..to] {
        if !r.bar.low.is_nan() {
            lo = lo.min(r.bar.low);
        }
        if !r.bar.high.is_nan() {
            hi = hi.max(r.bar.high);
        }
    }

    (lo.is_finite() && hi.is_finite()).then_some((lo, hi))
}

/// Clamp (value − lo)/(hi − lo) into [0, 1]. `None` if the window is
/// degenerate (hi ≤ lo) or any input is non-finite.
pub fn position_in_window(value: f64, lo: f64, hi: f64) -> Option<f64> {
    if !(value.is_finite() && lo.is_finite() && hi.is_finite()) || hi <= lo {
        return None;
    }
    Some(((value - lo) / (hi - lo)).clamp(0.0, 1.0))
}

/// Position of D-1's close inside D0's absolute window.
pub fn absolute_position(
    rows: &[FullFeatureRow],
    d0: usize,
    params: &ScanParameters,
) -> Option<f64> {
    let d1 = rows.get(d0.checked_sub(1)?)?;
    let (lo, hi) = window_bounds(rows, d0, params)?;
    position_in_window(d1.bar.close, lo, hi)
}
