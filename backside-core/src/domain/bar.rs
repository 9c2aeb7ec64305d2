//! Bar, the fundamental market data unit, and the per-ticker series built from it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Daily OHLCV bar for a single ticker on a single trading day.
///
/// Bars are immutable once ingested and uniquely keyed by `(ticker, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// Traded value for the day: close × volume.
    pub fn dollar_volume(&self) -> f64 {
        self.close * self.volume as f64
    }

    /// High minus low.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Date-ordered bars for one ticker.
///
/// Every rolling or exponential feature is defined over a `TickerSeries`,
/// never across tickers.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerSeries {
    pub ticker: String,
    pub bars: Vec<Bar>,
}

impl TickerSeries {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// True if dates are strictly increasing.
    pub fn is_strictly_ordered(&self) -> bool {
        self.bars.windows(2).all(|w| w[0].date < w[1].date)
    }
}

/// Deduplicated cross-sectional bar set, grouped by ticker.
///
/// Built from the union of every fetched daily snapshot. When two snapshots
/// carry the same `(ticker, date)` the first one inserted wins.
#[derive(Debug, Clone, Default)]
pub struct BarStore {
    series: BTreeMap<String, BTreeMap<NaiveDate, Bar>>,
    duplicates: usize,
}

impl BarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a bar. Returns false (and counts a duplicate) if the key exists.
    pub fn insert(&mut self, bar: Bar) -> bool {
        let by_date = self.series.entry(bar.ticker.clone()).or_default();
        if by_date.contains_key(&bar.date) {
            self.duplicates += 1;
            return false;
        }
        by_date.insert(bar.date, bar);
        true
    }

    pub fn extend(&mut self, bars: impl IntoIterator<Item = Bar>) {
        for bar in bars {
            self.insert(bar);
        }
    }

    /// Total number of unique bars.
    pub fn len(&self) -> usize {
        self.series.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(|m| m.is_empty())
    }

    pub fn ticker_count(&self) -> usize {
        self.series.len()
    }

    /// Number of rejected duplicate inserts.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Consume the store into per-ticker series, sorted by ticker then date.
    pub fn into_series(self) -> Vec<TickerSeries> {
        self.series
            .into_iter()
            .map(|(ticker, by_date)| TickerSeries {
                ticker,
                bars: by_date.into_values().collect(),
            })
            .collect()
    }
}

impl FromIterator<Bar> for BarStore {
    fn from_iter<I: IntoIterator<Item = Bar>>(iter: I) -> Self {
        let mut store = BarStore::new();
        store.extend(iter);
        store
    }
}
