//! Stage 2 simple features: the three cheap fields the smart filter reads.

use crate::domain::{Bar, TickerSeries};
use crate::indicators::{defined, rolling_mean};

/// Window of the un-shifted dollar-volume mean used by the smart filter.
pub const ROLLING_DOLLAR_VOLUME_PERIOD: usize = 20;

/// A bar plus the simple features computed over its ticker's full series.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub bar: Bar,
    pub prev_close: Option<f64>,
    /// Mean of close×volume over the last 20 rows, current row included.
    pub rolling_dollar_volume20: Option<f64>,
    /// high − low.
    pub daily_range: Option<f64>,
}

impl FeatureRow {
    /// All dependent fields are defined.
    pub fn is_complete(&self) -> bool {
        self.prev_close.is_some()
            && self.rolling_dollar_volume20.is_some()
            && self.daily_range.is_some()
    }
}

/// Compute `FeatureRow`s for every bar of a date-ordered series.
pub fn compute_simple_features(series: &TickerSeries) -> Vec<FeatureRow> {
    let dollar_volume: Vec<f64> = series.bars.iter().map(Bar::dollar_volume).collect();
    let adv20 = rolling_mean(&dollar_volume, ROLLING_DOLLAR_VOLUME_PERIOD);

    series
        .bars
        .iter()
        .enumerate()
        .map(|(i, bar)| FeatureRow {
            bar: bar.clone(),
            prev_close: i
                .checked_sub(1)
                .and_then(|p| defined(series.bars[p].close)),
            rolling_dollar_volume20: defined(adv20[i]),
            daily_range: defined(bar.range()),
        })
        .collect()
}
