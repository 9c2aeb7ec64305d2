//! Stage 2 smart filter.
//!
//! Narrows the D0 work list to output-range rows that clear the cheap
//! liquidity floors, while keeping every historical row of a surviving
//! ticker. Stage 3 recomputes 14/20-row statistics over the retained series,
//! so dropping historical rows here would corrupt every indicator near the
//! start of the output range.

use serde::{Deserialize, Serialize};

use super::simple::{compute_simple_features, FeatureRow};
use crate::domain::TickerSeries;
use crate::params::{OutputRange, ScanParameters};

/// Row and ticker counts for one smart-filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartFilterReport {
    pub tickers_in: usize,
    pub tickers_kept: usize,
    pub rows_in: usize,
    /// Rows dropped because a dependent feature was undefined.
    pub rows_undefined: usize,
    /// Historical rows retained for surviving tickers.
    pub historical_rows: usize,
    /// Output-range rows that qualified as D0 candidates.
    pub qualified_rows: usize,
}

/// Surviving tickers, each with its retained bars in date order.
#[derive(Debug, Clone)]
pub struct FilteredUniverse {
    pub series: Vec<TickerSeries>,
    pub report: SmartFilterReport,
}

/// Output-range liquidity check for one row.
pub fn qualifies_as_d0(row: &FeatureRow, params: &ScanParameters) -> bool {
    let (Some(prev_close), Some(adv), Some(range)) =
        (row.prev_close, row.rolling_dollar_volume20, row.daily_range)
    else {
        return false;
    };
    prev_close >= params.price_min
        && adv >= params.adv_min
        && range >= params.range_min
        && row.bar.volume >= params.volume_floor
}

/// Filter one ticker's precomputed rows.
///
/// Returns the retained rows (historical ∪ qualified output-range rows) in
/// their original order, or an empty vector if no output-range row
/// qualified. Applying this function to its own output is a no-op.
pub fn filter_rows(
    rows: Vec<FeatureRow>,
    range: &OutputRange,
    params: &ScanParameters,
) -> Vec<FeatureRow> {
    let mut any_qualified = false;
    let kept: Vec<FeatureRow> = rows
        .into_iter()
        .filter(FeatureRow::is_complete)
        .filter(|row| {
            if !range.contains(row.bar.date) {
                return true;
            }
            let ok = qualifies_as_d0(row, params);
            any_qualified |= ok;
            ok
        })
        .collect();

    if any_qualified {
        kept
    } else {
        Vec::new()
    }
}

/// Run Stage 2 over the whole ingested universe.
pub fn apply_smart_filter(
    universe: Vec<TickerSeries>,
    range: &OutputRange,
    params: &ScanParameters,
) -> FilteredUniverse {
    let mut report = SmartFilterReport {
        tickers_in: universe.len(),
        ..Default::default()
    };
    let mut survivors = Vec::new();

    for series in universe {
        let rows = compute_simple_features(&series);
        report.rows_in += rows.len();
        report.rows_undefined += rows.iter().filter(|r| !r.is_complete()).count();

        let kept = filter_rows(rows, range, params);
        if kept.is_empty() {
            continue;
        }

        let qualified = kept.iter().filter(|r| range.contains(r.bar.date)).count();
        report.qualified_rows += qualified;
        report.historical_rows += kept.len() - qualified;
        survivors.push(TickerSeries {
            ticker: series.ticker,
            bars: kept.into_iter().map(|r| r.bar).collect(),
        });
    }

    report.tickers_kept = survivors.len();
    FilteredUniverse {
        series: survivors,
        report,
    }
}
