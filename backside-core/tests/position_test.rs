//! Absolute-position window over a 1000-day history.
//!
//! D0 sits at the end of a 1012-row daily series. With lookback = 1000 and
//! exclusion = 10 the window is rows 1..=1001; D-1 (row 1010) lies outside it,
//! so its close can be placed anywhere relative to the window's lo/hi.

use backside_core::detect::{absolute_position, window_bounds};
use backside_core::domain::{Bar, TickerSeries};
use backside_core::features::{compute_full_features, FullFeatureRow};
use backside_core::params::ScanParameters;
use chrono::{Duration, NaiveDate};

const N: usize = 1012;
const D0: usize = N - 1;
const D1: usize = N - 2;
const LO: f64 = 10.0;
const HI: f64 = 90.0;

fn params() -> ScanParameters {
    ScanParameters {
        lookback_days: 1000,
        exclusion_days: 10,
        ..Default::default()
    }
}

/// Oscillating series with its extreme low on row 400 and extreme high on
/// row 700. Row 0 (outside the window) is more extreme still.
fn rows_with_d1_close(d1_close: f64) -> Vec<FullFeatureRow> {
    let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let bars = (0..N)
        .map(|i| {
            let mid = 50.0 + ((i % 17) as f64 - 8.0) * 2.0;
            let (mut low, mut high) = (mid - 3.0, mid + 3.0);
            match i {
                0 => (low, high) = (1.0, 200.0),
                400 => low = LO,
                700 => high = HI,
                _ => {}
            }
            let close = if i == D1 { d1_close } else { mid };
            Bar {
                ticker: "WIDE".into(),
                date: base + Duration::days(i as i64),
                open: mid,
                high: high.max(close),
                low: low.min(close),
                close,
                volume: 1_000_000,
            }
        })
        .collect();
    compute_full_features(&TickerSeries {
        ticker: "WIDE".into(),
        bars,
    })
}

#[test]
fn window_covers_lookback_before_exclusion() {
    let rows = rows_with_d1_close(50.0);
    assert_eq!(window_bounds(&rows, D0, &params()), Some((LO, HI)));
}

#[test]
fn close_at_window_low_is_zero() {
    assert_eq!(absolute_position(&rows_with_d1_close(LO), D0, &params()), Some(0.0));
}

#[test]
fn close_at_window_high_is_one() {
    assert_eq!(absolute_position(&rows_with_d1_close(HI), D0, &params()), Some(1.0));
}

#[test]
fn midpoint_is_half() {
    assert_eq!(absolute_position(&rows_with_d1_close(50.0), D0, &params()), Some(0.5));
}

#[test]
fn out_of_window_closes_are_clamped() {
    assert_eq!(absolute_position(&rows_with_d1_close(3.0), D0, &params()), Some(0.0));
    assert_eq!(absolute_position(&rows_with_d1_close(150.0), D0, &params()), Some(1.0));
}

#[test]
fn longer_lookback_reaches_older_extremes() {
    let rows = rows_with_d1_close(50.0);
    let wide = ScanParameters {
        lookback_days: 1001,
        ..params()
    };
    assert_eq!(window_bounds(&rows, D0, &wide), Some((1.0, 200.0)));
}
