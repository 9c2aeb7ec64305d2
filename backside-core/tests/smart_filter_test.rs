//! Property tests for the Stage 2 smart filter.
//!
//! 1. Idempotence: filtering already-filtered rows removes nothing.
//! 2. History preservation: a surviving ticker keeps every complete
//!    historical row.
//! 3. Survival: a ticker is kept iff at least one output-range row qualifies.

use backside_core::domain::{Bar, TickerSeries};
use backside_core::features::{apply_smart_filter, compute_simple_features, filter_rows, qualifies_as_d0};
use backside_core::params::{OutputRange, ScanParameters};
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

fn day(i: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 3, 1).unwrap() + Duration::days(i)
}

fn params() -> ScanParameters {
    ScanParameters {
        price_min: 10.0,
        adv_min: 5_000_000.0,
        range_min: 0.5,
        volume_floor: 300_000,
        ..Default::default()
    }
}

// ── Strategies (proptest) ────────────────────────────────────────────

/// (close, range, volume) per day.
fn arb_day() -> impl Strategy<Value = (f64, f64, u64)> {
    (5.0..40.0_f64, 0.1..2.0_f64, 50_000..1_000_000u64)
}

fn arb_series() -> impl Strategy<Value = TickerSeries> {
    prop::collection::vec(arb_day(), 30..80).prop_map(|days| TickerSeries {
        ticker: "PROP".into(),
        bars: days
            .into_iter()
            .enumerate()
            .map(|(i, (close, range, volume))| Bar {
                ticker: "PROP".into(),
                date: day(i as i64),
                open: close,
                high: close + range / 2.0,
                low: close - range / 2.0,
                close,
                volume,
            })
            .collect(),
    })
}

fn arb_range() -> impl Strategy<Value = OutputRange> {
    (20i64..40, 0i64..15).prop_map(|(start, len)| OutputRange::new(day(start), day(start + len)).unwrap())
}

proptest! {
    #[test]
    fn filter_is_idempotent(series in arb_series(), range in arb_range()) {
        let p = params();
        let once = filter_rows(compute_simple_features(&series), &range, &p);
        let twice = filter_rows(once.clone(), &range, &p);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn survivors_keep_all_complete_history(series in arb_series(), range in arb_range()) {
        let p = params();
        let rows = compute_simple_features(&series);
        let any_qualified = rows
            .iter()
            .any(|r| range.contains(r.bar.date) && qualifies_as_d0(r, &p));
        let complete_history: Vec<NaiveDate> = rows
            .iter()
            .filter(|r| r.is_complete() && !range.contains(r.bar.date))
            .map(|r| r.bar.date)
            .collect();

        let out = apply_smart_filter(vec![series], &range, &p);
        prop_assert_eq!(out.series.len(), usize::from(any_qualified));

        if let Some(kept) = out.series.first() {
            let kept_history: Vec<NaiveDate> = kept
                .bars
                .iter()
                .map(|b| b.date)
                .filter(|d| !range.contains(*d))
                .collect();
            prop_assert_eq!(kept_history, complete_history);
            prop_assert!(kept.is_strictly_ordered());
        }
    }

    #[test]
    fn every_kept_output_row_qualifies(series in arb_series(), range in arb_range()) {
        let p = params();
        let kept = filter_rows(compute_simple_features(&series), &range, &p);
        for row in kept.iter().filter(|r| range.contains(r.bar.date)) {
            prop_assert!(qualifies_as_d0(row, &p));
        }
    }
}

#[test]
fn history_near_range_start_survives() {
    // Liquid ticker whose rows right before the range are *illiquid*: they
    // must still be retained because they are history, not candidates.
    let mut bars: Vec<Bar> = (0..50)
        .map(|i| Bar {
            ticker: "EDGE".into(),
            date: day(i),
            open: 20.0,
            high: 21.0,
            low: 19.0,
            close: 20.0,
            volume: 800_000,
        })
        .collect();
    for b in &mut bars[35..40] {
        b.volume = 1_000;
    }
    let range = OutputRange::new(day(40), day(45)).unwrap();
    let out = apply_smart_filter(
        vec![TickerSeries {
            ticker: "EDGE".into(),
            bars,
        }],
        &range,
        &params(),
    );

    let dates: Vec<NaiveDate> = out.series[0].bars.iter().map(|b| b.date).collect();
    for i in 35..40 {
        assert!(dates.contains(&day(i)), "historical day {i} was dropped");
    }
}
