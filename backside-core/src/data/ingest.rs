//! Stage 1: grouped historical ingestion.
//!
//! One provider request per trading day, executed on the fetch pool. A failed
//! or empty day is dropped and tallied; nothing here returns an error. The
//! caller decides what an empty store means.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::provider::{DataError, MarketDataProvider};
use crate::domain::{Bar, BarStore};
use crate::observe::{ScanEvent, ScanObserver};
use crate::pool::WorkerPool;

/// Summary of an ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub days_requested: usize,
    pub days_ok: usize,
    pub days_failed: usize,
    /// Bars received before deduplication.
    pub bars_received: usize,
    /// Bars discarded because their `(ticker, date)` was already present.
    pub duplicates: usize,
    pub tickers: usize,
    pub failures: Vec<(NaiveDate, String)>,
}

impl IngestReport {
    pub fn all_succeeded(&self) -> bool {
        self.days_failed == 0
    }
}

#[derive(Debug)]
pub struct IngestOutcome {
    pub store: BarStore,
    pub report: IngestReport,
}

/// Fetch every day in `days` and merge the snapshots into one store.
pub fn ingest_history(
    provider: &dyn MarketDataProvider,
    days: &[NaiveDate],
    pool: &WorkerPool,
    observer: &dyn ScanObserver,
) -> IngestOutcome {
    let results: Vec<(NaiveDate, Result<Vec<Bar>, DataError>)> =
        pool.map(days.to_vec(), |date| {
            // Fail fast once the provider has stopped accepting requests
            if !provider.is_available() {
                return (date, Err(DataError::CircuitBreakerTripped));
            }
            let result = provider.fetch_day(date).and_then(|bars| {
                if bars.is_empty() {
                    Err(DataError::NoData { date })
                } else {
                    Ok(bars)
                }
            });
            match &result {
                Ok(bars) => observer.on_event(&ScanEvent::DayFetched {
                    date,
                    bars: bars.len(),
                }),
                Err(e) => observer.on_event(&ScanEvent::DayFailed {
                    date,
                    reason: e.to_string(),
                }),
            }
            (date, result)
        });

    let mut store = BarStore::new();
    let mut report = IngestReport {
        days_requested: days.len(),
        ..Default::default()
    };

    for (date, result) in results {
        match result {
            Ok(bars) => {
                report.days_ok += 1;
                report.bars_received += bars.len();
                store.extend(bars);
            }
            Err(e) => {
                report.days_failed += 1;
                report.failures.push((date, e.to_string()));
            }
        }
    }

    report.duplicates = store.duplicates();
    report.tickers = store.ticker_count();
    IngestOutcome { store, report }
}
