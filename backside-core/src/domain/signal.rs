//! Signal: the terminal output of a scan.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which prior row armed the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerTag {
    #[serde(rename = "D-1")]
    DMinus1,
    #[serde(rename = "D-2")]
    DMinus2,
}

impl TriggerTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerTag::DMinus1 => "D-1",
            TriggerTag::DMinus2 => "D-2",
        }
    }
}

impl fmt::Display for TriggerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric snapshot taken when a candidate passes every gate.
///
/// Fields guaranteed by a passing gate are plain `f64`; fields that can still
/// be undefined on a passing candidate are `Option`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMetrics {
    /// D-1 close within the absolute high/low window, in [0, 1].
    pub position: f64,
    /// (close − open)/atr14 of D-1.
    pub d1_body_over_atr: f64,
    /// D-1 share volume.
    pub d1_volume: u64,
    /// D-1 volume / D-1 volAvg14.
    pub d1_volume_ratio: Option<f64>,
    /// max(D-1, D-2) of volume / volAvg14.
    pub volume_signal_max: Option<f64>,
    /// |open − prevClose|/atr14 of D0.
    pub gap_over_atr: f64,
    /// D0 open above the high two rows earlier.
    pub open_above_prev_high: bool,
    pub open_over_ema9: f64,
    pub d1_high_above_d2: bool,
    pub d1_close_above_d2: bool,
    /// slope9_5d of D0.
    pub slope9_5d: Option<f64>,
    /// (high − ema9)/atr14 of the row that satisfied the trigger mold.
    pub high_over_ema9_atr_trigger: f64,
    /// dollarVolAvg20 of D0.
    pub dollar_vol_avg20: Option<f64>,
    pub close: f64,
    pub volume: u64,
}

/// A detected backside setup for one ticker on one D0 date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub ticker: String,
    pub date: NaiveDate,
    pub trigger: TriggerTag,
    pub metrics: SignalMetrics,
}

/// Sort signals by date, then ticker.
pub fn sort_signals(signals: &mut [Signal]) {
    signals.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.ticker.cmp(&b.ticker)));
}
