//! Pipeline integration tests with an in-memory provider.
//!
//! Tests:
//! 1. Failed days are dropped and tallied, the scan still completes
//! 2. Repeated (ticker, date) bars are deduplicated
//! 3. An illiquid ticker with zero qualified D0 rows never reaches detection
//! 4. A provider that returns nothing is the only scan-level failure
//! 5. Signals come back sorted by date then ticker

use backside_core::data::{DataError, MarketDataProvider, TradingCalendar, UsEquityCalendar};
use backside_core::domain::Bar;
use backside_core::observe::{RecordingObserver, ScanEvent};
use backside_core::params::{OutputRange, ScanParameters};
use backside_core::pipeline::{ScanError, Scanner};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Serves pre-built bars per day; listed dates fail with HTTP 500.
struct MemoryProvider {
    by_date: BTreeMap<NaiveDate, Vec<Bar>>,
    failing: HashSet<NaiveDate>,
}

impl MarketDataProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch_day(&self, date: NaiveDate) -> Result<Vec<Bar>, DataError> {
        if self.failing.contains(&date) {
            return Err(DataError::HttpStatus { status: 500, date });
        }
        self.by_date
            .get(&date)
            .cloned()
            .ok_or(DataError::NoData { date })
    }
}

fn range() -> OutputRange {
    OutputRange::new(d(2024, 5, 6), d(2024, 5, 17)).unwrap()
}

fn params() -> ScanParameters {
    ScanParameters {
        lookback_days: 200,
        exclusion_days: 10,
        ingest_margin_days: 20,
        ..Default::default()
    }
}

/// LIQD trades $400M/day in a wide range; THIN trades a few thousand shares.
/// Every LIQD bar is served twice.
fn provider(failing: &[NaiveDate]) -> MemoryProvider {
    let days = UsEquityCalendar::new()
        .trading_days(range().data_start(&params()), range().end)
        .unwrap();
    let mut by_date = BTreeMap::new();
    for (i, date) in days.into_iter().enumerate() {
        let wiggle = (i % 7) as f64 * 0.3;
        let liquid = Bar {
            ticker: "LIQD".into(),
            date,
            open: 40.0 + wiggle,
            high: 42.0 + wiggle,
            low: 39.0 + wiggle,
            close: 41.0 + wiggle,
            volume: 10_000_000,
        };
        let thin = Bar {
            ticker: "THIN".into(),
            date,
            open: 5.0,
            high: 5.1,
            low: 4.9,
            close: 5.0,
            volume: 3_000,
        };
        by_date.insert(date, vec![liquid.clone(), thin, liquid]);
    }
    MemoryProvider {
        by_date,
        failing: failing.iter().copied().collect(),
    }
}

#[test]
fn failed_days_are_dropped_not_fatal() {
    let failing = [d(2024, 3, 5), d(2024, 4, 10)];
    let p = provider(&failing);
    let calendar = UsEquityCalendar::new();
    let outcome = Scanner::new(&p, &calendar)
        .with_workers(5, 10)
        .run(&params(), &range())
        .unwrap();

    let ingest = &outcome.stats.ingest;
    assert_eq!(ingest.days_failed, 2);
    assert_eq!(ingest.days_ok + ingest.days_failed, ingest.days_requested);
    let failed_dates: HashSet<NaiveDate> = ingest.failures.iter().map(|(d, _)| *d).collect();
    assert_eq!(failed_dates, failing.iter().copied().collect());
}

#[test]
fn duplicate_bars_are_discarded() {
    let p = provider(&[]);
    let calendar = UsEquityCalendar::new();
    let outcome = Scanner::new(&p, &calendar).run(&params(), &range()).unwrap();

    let ingest = &outcome.stats.ingest;
    assert_eq!(ingest.bars_received, ingest.days_ok * 3);
    assert_eq!(ingest.duplicates, ingest.days_ok);
    assert_eq!(ingest.tickers, 2);
}

#[test]
fn unqualified_ticker_never_reaches_detection() {
    let p = provider(&[]);
    let calendar = UsEquityCalendar::new();
    let obs = RecordingObserver::new();
    let outcome = Scanner::new(&p, &calendar)
        .with_observer(&obs)
        .run(&params(), &range())
        .unwrap();

    assert_eq!(outcome.stats.filter.tickers_in, 2);
    assert_eq!(outcome.stats.filter.tickers_kept, 1);
    assert!(outcome.signals.iter().all(|s| s.ticker != "THIN"));

    let touched_thin = obs.events().iter().any(|e| match e {
        ScanEvent::TickerSignals { ticker, .. }
        | ScanEvent::TickerSkipped { ticker, .. }
        | ScanEvent::TickerFailed { ticker, .. } => ticker == "THIN",
        _ => false,
    });
    assert!(!touched_thin);
    assert_eq!(outcome.stats.tickers_evaluated, 1);
}

#[test]
fn empty_provider_is_no_data() {
    let p = MemoryProvider {
        by_date: BTreeMap::new(),
        failing: HashSet::new(),
    };
    let calendar = UsEquityCalendar::new();
    let err = Scanner::new(&p, &calendar)
        .run(&params(), &range())
        .unwrap_err();
    assert!(matches!(err, ScanError::NoData { .. }));
}

#[test]
fn flat_market_is_an_empty_success() {
    // LIQD never runs up, so nothing arms the mold: zero signals is Ok.
    let p = provider(&[]);
    let calendar = UsEquityCalendar::new();
    let outcome = Scanner::new(&p, &calendar).run(&params(), &range()).unwrap();
    assert!(outcome.signals.is_empty());
    assert_eq!(outcome.stats.signals, 0);
}

#[test]
fn short_history_ticker_is_skipped() {
    let p = provider(&[]);
    let calendar = UsEquityCalendar::new();
    let obs = RecordingObserver::new();
    let short = ScanParameters {
        lookback_days: 30,
        exclusion_days: 5,
        ingest_margin_days: 10,
        ..Default::default()
    };
    let outcome = Scanner::new(&p, &calendar)
        .with_observer(&obs)
        .run(&short, &range())
        .unwrap();

    assert_eq!(outcome.stats.tickers_skipped, 1);
    assert!(obs
        .events()
        .iter()
        .any(|e| matches!(e, ScanEvent::TickerSkipped { ticker, .. } if ticker == "LIQD")));
}
