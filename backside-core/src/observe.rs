//! Scan progress events.
//!
//! Stages report what they are doing through a `ScanObserver` instead of
//! printing. The default `TracingObserver` turns events into log lines;
//! `RecordingObserver` keeps them for inspection in tests or UIs.

use chrono::NaiveDate;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::features::SmartFilterReport;

/// Pipeline stage identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    SmartFilter,
    Detect,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::SmartFilter => "smart_filter",
            Stage::Detect => "detect",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    StageStarted {
        stage: Stage,
        units: usize,
    },
    StageFinished {
        stage: Stage,
        elapsed: Duration,
    },
    DayFetched {
        date: NaiveDate,
        bars: usize,
    },
    DayFailed {
        date: NaiveDate,
        reason: String,
    },
    Filtered(SmartFilterReport),
    TickerSkipped {
        ticker: String,
        reason: String,
    },
    TickerFailed {
        ticker: String,
        reason: String,
    },
    TickerSignals {
        ticker: String,
        signals: usize,
    },
}

/// Receives scan events. Called from worker threads.
pub trait ScanObserver: Send + Sync {
    fn on_event(&self, event: &ScanEvent);
}

/// Discards every event.
pub struct NullObserver;

impl ScanObserver for NullObserver {
    fn on_event(&self, _event: &ScanEvent) {}
}

/// Logs events through `tracing`.
pub struct TracingObserver;

impl ScanObserver for TracingObserver {
    fn on_event(&self, event: &ScanEvent) {
        match event {
            ScanEvent::StageStarted { stage, units } => {
                info!(stage = stage.as_str(), units, "stage started")
            }
            ScanEvent::StageFinished { stage, elapsed } => {
                info!(
                    stage = stage.as_str(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "stage finished"
                )
            }
            ScanEvent::DayFetched { date, bars } => debug!(%date, bars, "day fetched"),
            ScanEvent::DayFailed { date, reason } => warn!(%date, %reason, "day dropped"),
            ScanEvent::Filtered(r) => info!(
                tickers_in = r.tickers_in,
                tickers_kept = r.tickers_kept,
                qualified_rows = r.qualified_rows,
                historical_rows = r.historical_rows,
                "smart filter applied"
            ),
            ScanEvent::TickerSkipped { ticker, reason } => {
                debug!(%ticker, %reason, "ticker skipped")
            }
            ScanEvent::TickerFailed { ticker, reason } => {
                warn!(%ticker, %reason, "ticker evaluation failed")
            }
            ScanEvent::TickerSignals { ticker, signals } => {
                debug!(%ticker, signals, "ticker signals")
            }
        }
    }
}

/// Keeps every event in arrival order.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ScanEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ScanEvent> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl ScanObserver for RecordingObserver {
    fn on_event(&self, event: &ScanEvent) {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        events.push(event.clone());
    }
}
