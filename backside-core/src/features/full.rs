//! Stage 3a full features.
//!
//! Computed over a surviving ticker's entire retained series, qualified or
//! not. The three trailing means (atr14, vol_avg14, dollar_vol_avg20) are
//! lag-shifted by one row: the value on row D covers rows D-1..D-N and never
//! row D itself.

use crate::domain::{Bar, TickerSeries};
use crate::indicators::{defined, ema_of_series, pct_change, prior_mean, rolling_mean, true_range};

use super::simple::ROLLING_DOLLAR_VOLUME_PERIOD;

pub const EMA_FAST: usize = 9;
pub const EMA_SLOW: usize = 20;
pub const ATR_PERIOD: usize = 14;
pub const VOLUME_AVG_PERIOD: usize = 14;
pub const DOLLAR_VOLUME_AVG_PERIOD: usize = 20;
pub const SLOPE_LAG: usize = 5;

/// Every feature the detection engine reads, for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct FullFeatureRow {
    pub bar: Bar,

    // ── simple features ──
    pub prev_close: Option<f64>,
    pub rolling_dollar_volume20: Option<f64>,
    pub daily_range: Option<f64>,

    // ── lagged raw fields ──
    pub prev_open: Option<f64>,
    pub prev_high: Option<f64>,
    pub prev_volume: Option<f64>,
    pub prev2_high: Option<f64>,
    pub prev2_close: Option<f64>,

    // ── indicators ──
    pub ema9: Option<f64>,
    pub ema20: Option<f64>,
    pub true_range: Option<f64>,
    pub atr14: Option<f64>,
    pub vol_avg14: Option<f64>,
    pub dollar_vol_avg20: Option<f64>,
    pub slope9_5d: Option<f64>,

    // ── ratios ──
    pub high_over_ema9_div_atr: Option<f64>,
    pub gap_over_atr: Option<f64>,
    pub open_over_ema9: Option<f64>,
    pub body_over_atr: Option<f64>,
}

impl FullFeatureRow {
    /// trueRange / atr14.
    pub fn atr_ratio(&self) -> Option<f64> {
        defined(self.true_range? / self.atr14?)
    }

    /// Row volume relative to its (prior) 14-row average.
    pub fn volume_ratio(&self) -> Option<f64> {
        let avg = self.positive_vol_avg()?;
        defined(self.bar.volume as f64 / avg)
    }

    /// Previous row's volume relative to this row's 14-row average.
    pub fn prev_volume_ratio(&self) -> Option<f64> {
        let avg = self.positive_vol_avg()?;
        defined(self.prev_volume? / avg)
    }

    /// max(volume_ratio, prev_volume_ratio); defined if either side is.
    pub fn volume_signal(&self) -> Option<f64> {
        match (self.volume_ratio(), self.prev_volume_ratio()) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    fn positive_vol_avg(&self) -> Option<f64> {
        self.vol_avg14.filter(|v| *v > 0.0)
    }
}

fn at(values: &[f64], i: usize) -> Option<f64> {
    values.get(i).copied().and_then(defined)
}

fn back(values: &[f64], i: usize, lag: usize) -> Option<f64> {
    i.checked_sub(lag).and_then(|j| at(values, j))
}

/// Compute `FullFeatureRow`s for a date-ordered series.
pub fn compute_full_features(series: &TickerSeries) -> Vec<FullFeatureRow> {
    let bars = &series.bars;
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();
    let dollar_volume: Vec<f64> = bars.iter().map(Bar::dollar_volume).collect();

    let ema9 = ema_of_series(&closes, EMA_FAST);
    let ema20 = ema_of_series(&closes, EMA_SLOW);
    let tr = true_range(bars);
    let atr14 = prior_mean(&tr, ATR_PERIOD);
    let vol_avg14 = prior_mean(&volumes, VOLUME_AVG_PERIOD);
    let dollar_vol_avg20 = prior_mean(&dollar_volume, DOLLAR_VOLUME_AVG_PERIOD);
    let rolling_dv20 = rolling_mean(&dollar_volume, ROLLING_DOLLAR_VOLUME_PERIOD);
    let slope = pct_change(&ema9, SLOPE_LAG);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let prev_close = back(&closes, i, 1);
            let ema9_i = at(&ema9, i);
            let atr = at(&atr14, i);

            let high_over_ema9_div_atr = match (ema9_i, atr) {
                (Some(e), Some(a)) => defined((bar.high - e) / a),
                _ => None,
            };
            let gap_over_atr = match (prev_close, atr) {
                (Some(pc), Some(a)) => defined((bar.open - pc).abs() / a),
                _ => None,
            };
            let open_over_ema9 = ema9_i.and_then(|e| defined(bar.open / e));
            let body_over_atr = atr.and_then(|a| defined((bar.close - bar.open) / a));

            FullFeatureRow {
                bar: bar.clone(),
                prev_close,
                rolling_dollar_volume20: at(&rolling_dv20, i),
                daily_range: defined(bar.range()),
                prev_open: back(&opens, i, 1),
                prev_high: back(&highs, i, 1),
                prev_volume: back(&volumes, i, 1),
                prev2_high: back(&highs, i, 2),
                prev2_close: back(&closes, i, 2),
                ema9: ema9_i,
                ema20: at(&ema20, i),
                true_range: at(&tr, i),
                atr14: atr,
                vol_avg14: at(&vol_avg14, i),
                dollar_vol_avg20: at(&dollar_vol_avg20, i),
                slope9_5d: at(&slope, i),
                high_over_ema9_div_atr,
                gap_over_atr,
                open_over_ema9,
                body_over_atr,
            }
        })
        .collect()
}
