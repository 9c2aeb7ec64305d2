//! Scan orchestration: Stage 1 → Stage 2 → Stage 3, with a join between each.
//!
//! The scanner owns no data between runs. Each stage consumes the full output
//! of the previous one; per-day and per-ticker failures degrade the result
//! and are reported through the observer, never propagated.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::info;

use crate::data::{ingest_history, CalendarError, IngestReport, MarketDataProvider, TradingCalendar};
use crate::detect::{detect_isolated, detect_ticker, DetectError};
use crate::domain::{sort_signals, Signal, TickerSeries};
use crate::features::{apply_smart_filter, SmartFilterReport};
use crate::observe::{ScanEvent, ScanObserver, Stage, TracingObserver};
use crate::params::{OutputRange, ParamError, ScanParameters};
use crate::pool::{PoolError, WorkerPool};

pub const DEFAULT_FETCH_WORKERS: usize = 5;
pub const DEFAULT_DETECT_WORKERS: usize = 10;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid scan parameters: {0}")]
    Params(#[from] ParamError),

    #[error("trading calendar: {0}")]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("no bars ingested for {days} trading days ({failed} failed)")]
    NoData { days: usize, failed: usize },
}

/// Per-stage wall-clock timings in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    pub ingest_ms: u64,
    pub smart_filter_ms: u64,
    pub detect_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    pub ingest: IngestReport,
    pub filter: SmartFilterReport,
    pub tickers_evaluated: usize,
    pub tickers_skipped: usize,
    pub tickers_failed: usize,
    pub signals: usize,
    pub timings: StageTimings,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Sorted by date, then ticker.
    pub signals: Vec<Signal>,
    pub stats: ScanStats,
}

/// Per-ticker Stage 3 entry point.
pub type Detector =
    dyn Fn(&TickerSeries, &OutputRange, &ScanParameters) -> Result<Vec<Signal>, DetectError> + Sync;

/// Wires a provider and a calendar to the three scan stages.
pub struct Scanner<'a> {
    provider: &'a dyn MarketDataProvider,
    calendar: &'a dyn TradingCalendar,
    observer: &'a dyn ScanObserver,
    detector: &'a Detector,
    fetch_workers: usize,
    detect_workers: usize,
}

static TRACING_OBSERVER: TracingObserver = TracingObserver;

impl<'a> Scanner<'a> {
    pub fn new(provider: &'a dyn MarketDataProvider, calendar: &'a dyn TradingCalendar) -> Self {
        Self {
            provider,
            calendar,
            observer: &TRACING_OBSERVER,
            detector: &detect_ticker,
            fetch_workers: DEFAULT_FETCH_WORKERS,
            detect_workers: DEFAULT_DETECT_WORKERS,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn ScanObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Replace the per-ticker detector. A detector that panics fails only
    /// its own ticker.
    pub fn with_detector(mut self, detector: &'a Detector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_workers(mut self, fetch_workers: usize, detect_workers: usize) -> Self {
        self.fetch_workers = fetch_workers;
        self.detect_workers = detect_workers;
        self
    }

    /// Run a full scan over `range`.
    ///
    /// Returns `ScanError::NoData` only when every requested day failed or was
    /// empty. Zero signals is a successful outcome.
    pub fn run(&self, params: &ScanParameters, range: &OutputRange) -> Result<ScanOutcome, ScanError> {
        params.validate()?;
        let mut stats = ScanStats::default();

        // ── Stage 1: ingestion ──
        let data_start = range.data_start(params);
        let days = self.calendar.trading_days(data_start, range.end)?;
        info!(
            provider = self.provider.name(),
            %data_start,
            output_start = %range.start,
            output_end = %range.end,
            days = days.len(),
            "scan started"
        );

        let started = Instant::now();
        self.observer.on_event(&ScanEvent::StageStarted {
            stage: Stage::Ingest,
            units: days.len(),
        });
        let fetch_pool = WorkerPool::new("fetch", self.fetch_workers)?;
        let ingested = ingest_history(self.provider, &days, &fetch_pool, self.observer);
        stats.timings.ingest_ms = self.finish(Stage::Ingest, started);
        stats.ingest = ingested.report;

        if ingested.store.is_empty() {
            return Err(ScanError::NoData {
                days: stats.ingest.days_requested,
                failed: stats.ingest.days_failed,
            });
        }

        // ── Stage 2: simple features + smart filter ──
        let started = Instant::now();
        let universe = ingested.store.into_series();
        self.observer.on_event(&ScanEvent::StageStarted {
            stage: Stage::SmartFilter,
            units: universe.len(),
        });
        let filtered = apply_smart_filter(universe, range, params);
        self.observer
            .on_event(&ScanEvent::Filtered(filtered.report));
        stats.timings.smart_filter_ms = self.finish(Stage::SmartFilter, started);
        stats.filter = filtered.report;

        // ── Stage 3: full features + detection ──
        let started = Instant::now();
        self.observer.on_event(&ScanEvent::StageStarted {
            stage: Stage::Detect,
            units: filtered.series.len(),
        });
        let detect_pool = WorkerPool::new("detect", self.detect_workers)?;
        let detector = self.detector;
        let results: Vec<(String, Result<Vec<Signal>, DetectError>)> =
            detect_pool.map(filtered.series, |series| {
                let result = detect_isolated(&series.ticker, || detector(&series, range, params));
                (series.ticker, result)
            });

        let mut signals = Vec::new();
        for (ticker, result) in results {
            match result {
                Ok(found) => {
                    stats.tickers_evaluated += 1;
                    self.observer.on_event(&ScanEvent::TickerSignals {
                        ticker,
                        signals: found.len(),
                    });
                    signals.extend(found);
                }
                Err(e) if e.is_expected() => {
                    stats.tickers_skipped += 1;
                    self.observer.on_event(&ScanEvent::TickerSkipped {
                        ticker,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    stats.tickers_failed += 1;
                    self.observer.on_event(&ScanEvent::TickerFailed {
                        ticker,
                        reason: e.to_string(),
                    });
                }
            }
        }
        stats.timings.detect_ms = self.finish(Stage::Detect, started);

        sort_signals(&mut signals);
        stats.signals = signals.len();
        info!(
            signals = stats.signals,
            tickers_evaluated = stats.tickers_evaluated,
            tickers_skipped = stats.tickers_skipped,
            tickers_failed = stats.tickers_failed,
            "scan finished"
        );
        Ok(ScanOutcome { signals, stats })
    }

    fn finish(&self, stage: Stage, started: Instant) -> u64 {
        let elapsed = started.elapsed();
        self.observer
            .on_event(&ScanEvent::StageFinished { stage, elapsed });
        elapsed.as_millis() as u64
    }
}
