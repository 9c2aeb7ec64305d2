//! Deterministic synthetic market for offline scans and tests.
//!
//! Each ticker is a seeded random walk over weekdays with occasional
//! multi-day run-ups on heavy volume, so the scan pipeline has something to
//! find without a network connection.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use super::provider::{DataError, MarketDataProvider};
use crate::domain::Bar;

/// Shape of the generated universe.
#[derive(Debug, Clone)]
pub struct SyntheticUniverse {
    pub seed: u64,
    pub tickers: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub struct SyntheticProvider {
    by_date: BTreeMap<NaiveDate, Vec<Bar>>,
}

impl SyntheticProvider {
    pub fn new(universe: &SyntheticUniverse) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<Bar>> = BTreeMap::new();
        for i in 0..universe.tickers {
            let ticker = synthetic_ticker(i);
            for bar in generate_walk(&ticker, universe) {
                by_date.entry(bar.date).or_default().push(bar);
            }
        }
        Self { by_date }
    }

    pub fn days(&self) -> usize {
        self.by_date.len()
    }
}

impl MarketDataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_day(&self, date: NaiveDate) -> Result<Vec<Bar>, DataError> {
        match self.by_date.get(&date) {
            Some(bars) if !bars.is_empty() => Ok(bars.clone()),
            _ => Err(DataError::NoData { date }),
        }
    }
}

/// `SYN0000`, `SYN0001`, ...
fn synthetic_ticker(index: usize) -> String {
    format!("SYN{index:04}")
}

fn generate_walk(ticker: &str, universe: &SyntheticUniverse) -> Vec<Bar> {
    // Seed from the universe seed and the ticker name
    let mut hasher = blake3::Hasher::new();
    hasher.update(&universe.seed.to_le_bytes());
    hasher.update(ticker.as_bytes());
    let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

    let mut bars = Vec::new();
    let mut price: f64 = rng.gen_range(10.0..150.0);
    let base_volume: f64 = rng.gen_range(2_000_000.0..20_000_000.0);
    let mut run_up_left = 0u32;

    for date in universe.start.iter_days().take_while(|d| *d <= universe.end) {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }

        if run_up_left == 0 && rng.gen_bool(0.004) {
            run_up_left = rng.gen_range(4..9);
        }
        let (daily_return, volume_mult) = if run_up_left > 0 {
            run_up_left -= 1;
            (rng.gen_range(0.02..0.09), rng.gen_range(2.0..5.0))
        } else {
            (rng.gen_range(-0.025..0.025), rng.gen_range(0.5..1.5))
        };

        let gap: f64 = rng.gen_range(-0.01..0.01);
        let open = price * (1.0 + gap);
        let close = (price * (1.0 + daily_return)).max(0.5);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.02));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.02));
        let volume = (base_volume * volume_mult).round() as u64;

        bars.push(Bar {
            ticker: ticker.to_string(),
            date,
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
    }
    bars
}
