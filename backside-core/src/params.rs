//! Scan parameters: every threshold the smart filter and the detection engine read.
//!
//! `ScanParameters` is built once (defaults, TOML, or code), validated, and
//! then passed by reference into every stage. Nothing mutates it afterwards.
//! Optional gates are `Option<T>`: `None` disables the gate.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for every day-count parameter (about a century).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// `date` minus `days` calendar days, or `None` outside chrono's date range.
pub fn days_before(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    Duration::try_days(days).and_then(|delta| date.checked_sub_signed(delta))
}

/// Which prior rows may satisfy the trigger mold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerMode {
    /// Only D-1 is tested.
    #[serde(rename = "D1_only")]
    D1Only,
    /// D-1 is tested first, then D-2.
    #[serde(rename = "D1_or_D2")]
    D1OrD2,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("parameter '{field}' must be finite and non-negative (got {value})")]
    InvalidThreshold { field: &'static str, value: f64 },

    #[error("pos_abs_max must be within [0, 1] (got {0})")]
    PositionOutOfRange(f64),

    #[error("lookback_days must be positive")]
    EmptyLookback,

    #[error("parameter '{field}' spans {value} days (max {max})")]
    WindowTooLong {
        field: &'static str,
        value: i64,
        max: i64,
    },

    #[error("output range start {start} is after end {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("failed to serialize parameters: {0}")]
    Serialize(String),
}

/// Immutable threshold record for a backside scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanParameters {
    // ── Liquidity / price floors (smart filter + mold) ──
    pub price_min: f64,
    pub adv_min: f64,
    /// Smart filter: minimum high − low of the D0 row.
    pub range_min: f64,
    /// Smart filter: minimum share volume of the D0 row.
    pub volume_floor: u64,

    // ── Absolute position window ──
    pub lookback_days: i64,
    pub exclusion_days: i64,
    /// Extra calendar days fetched ahead of the lookback window.
    pub ingest_margin_days: i64,
    pub pos_abs_max: f64,

    // ── Trigger mold ──
    pub trigger_mode: TriggerMode,
    pub atr_mult: f64,
    pub vol_mult: f64,
    pub slope_min: f64,
    pub high_ema9_mult: f64,

    // ── D-1 quality ──
    pub d1_green_atr_min: f64,
    pub d1_volume_min: Option<u64>,
    pub d1_vol_mult_min: Option<f64>,
    pub enforce_d1_above_d2: bool,

    // ── D0 ──
    pub gap_div_atr_min: f64,
    pub require_open_above_d1_prev_high: bool,
    pub open_over_ema9_min: f64,
}

impl Default for ScanParameters {
    fn default() -> Self {
        Self {
            price_min: 8.0,
            adv_min: 30_000_000.0,
            range_min: 0.50,
            volume_floor: 1_000_000,
            lookback_days: 1000,
            exclusion_days: 10,
            ingest_margin_days: 50,
            pos_abs_max: 0.75,
            trigger_mode: TriggerMode::D1OrD2,
            atr_mult: 0.9,
            vol_mult: 0.9,
            slope_min: 3.0,
            high_ema9_mult: 1.05,
            d1_green_atr_min: 0.30,
            d1_volume_min: Some(15_000_000),
            d1_vol_mult_min: None,
            enforce_d1_above_d2: true,
            gap_div_atr_min: 0.75,
            require_open_above_d1_prev_high: true,
            open_over_ema9_min: 0.9,
        }
    }
}

impl ScanParameters {
    /// Reject thresholds that would make gates meaningless.
    ///
    /// `slope_min` may be negative (a falling EMA is a valid floor); every
    /// other float threshold must be finite and non-negative.
    pub fn validate(&self) -> Result<(), ParamError> {
        let non_negative = [
            ("price_min", self.price_min),
            ("adv_min", self.adv_min),
            ("range_min", self.range_min),
            ("atr_mult", self.atr_mult),
            ("vol_mult", self.vol_mult),
            ("high_ema9_mult", self.high_ema9_mult),
            ("gap_div_atr_min", self.gap_div_atr_min),
            ("open_over_ema9_min", self.open_over_ema9_min),
            ("exclusion_days", self.exclusion_days as f64),
            ("ingest_margin_days", self.ingest_margin_days as f64),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ParamError::InvalidThreshold { field, value });
            }
        }
        for (field, value) in [
            ("slope_min", self.slope_min),
            ("d1_green_atr_min", self.d1_green_atr_min),
        ] {
            if !value.is_finite() {
                return Err(ParamError::InvalidThreshold { field, value });
            }
        }
        if let Some(v) = self.d1_vol_mult_min {
            if !v.is_finite() || v < 0.0 {
                return Err(ParamError::InvalidThreshold {
                    field: "d1_vol_mult_min",
                    value: v,
                });
            }
        }
        if !(0.0..=1.0).contains(&self.pos_abs_max) {
            return Err(ParamError::PositionOutOfRange(self.pos_abs_max));
        }
        if self.lookback_days <= 0 {
            return Err(ParamError::EmptyLookback);
        }
        for (field, value) in [
            ("lookback_days", self.lookback_days),
            ("exclusion_days", self.exclusion_days),
            ("ingest_margin_days", self.ingest_margin_days),
        ] {
            if value > MAX_WINDOW_DAYS {
                return Err(ParamError::WindowTooLong {
                    field,
                    value,
                    max: MAX_WINDOW_DAYS,
                });
            }
        }
        Ok(())
    }

    /// Calendar days of history fetched before the first output date.
    pub fn history_days(&self) -> i64 {
        self.lookback_days
            .saturating_add(self.exclusion_days)
            .saturating_add(self.ingest_margin_days)
    }

    /// BLAKE3 hash of the canonical JSON form. Identical parameters always
    /// produce the same fingerprint.
    pub fn fingerprint(&self) -> Result<String, ParamError> {
        let json = serde_json::to_string(self).map_err(|e| ParamError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Render as a TOML table body.
    pub fn to_toml_string(&self) -> Result<String, ParamError> {
        toml::to_string_pretty(self).map_err(|e| ParamError::Serialize(e.to_string()))
    }
}

/// Inclusive range of D0 dates a scan reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl OutputRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ParamError> {
        if start > end {
            return Err(ParamError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// First date that must be ingested so every output date has a full
    /// lookback window behind it. Saturates at `NaiveDate::MIN`.
    pub fn data_start(&self, params: &ScanParameters) -> NaiveDate {
        days_before(self.start, params.history_days()).unwrap_or(NaiveDate::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn defaults_validate() {
        assert_eq!(ScanParameters::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_negative_threshold() {
        let p = ScanParameters {
            atr_mult: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            p.validate(),
            Err(ParamError::InvalidThreshold { field: "atr_mult", .. })
        ));
    }

    #[test]
    fn rejects_nan_threshold() {
        let p = ScanParameters {
            gap_div_atr_min: f64::NAN,
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn negative_slope_floor_is_allowed() {
        let p = ScanParameters {
            slope_min: -2.0,
            ..Default::default()
        };
        assert_eq!(p.validate(), Ok(()));
    }

    #[test]
    fn rejects_position_above_one() {
        let p = ScanParameters {
            pos_abs_max: 1.5,
            ..Default::default()
        };
        assert_eq!(p.validate(), Err(ParamError::PositionOutOfRange(1.5)));
    }

    #[test]
    fn fingerprint_is_deterministic_and_sensitive() {
        let a = ScanParameters::default();
        let b = ScanParameters::default();
        let c = ScanParameters {
            vol_mult: 1.0,
            ..Default::default()
        };
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let p: ScanParameters = toml::from_str(
            r#"
            price_min = 5.0
            trigger_mode = "D1_only"
            d1_vol_mult_min = 1.5
            "#,
        )
        .unwrap();
        assert_eq!(p.price_min, 5.0);
        assert_eq!(p.trigger_mode, TriggerMode::D1Only);
        assert_eq!(p.d1_vol_mult_min, Some(1.5));
        assert_eq!(p.adv_min, ScanParameters::default().adv_min);
        assert_eq!(p.d1_volume_min, Some(15_000_000));
    }

    #[test]
    fn toml_roundtrip_preserves_parameters() {
        let p = ScanParameters::default();
        let text = p.to_toml_string().unwrap();
        let back: ScanParameters = toml::from_str(&text).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn output_range_rejects_inverted() {
        assert!(OutputRange::new(d(2024, 2, 1), d(2024, 1, 1)).is_err());
    }

    #[test]
    fn data_start_covers_lookback_exclusion_and_margin() {
        let range = OutputRange::new(d(2024, 6, 3), d(2024, 6, 28)).unwrap();
        let p = ScanParameters {
            lookback_days: 100,
            exclusion_days: 10,
            ingest_margin_days: 20,
            ..Default::default()
        };
        assert_eq!(range.data_start(&p), d(2024, 6, 3) - Duration::days(130));
        assert!(range.contains(d(2024, 6, 3)));
        assert!(range.contains(d(2024, 6, 28)));
        assert!(!range.contains(d(2024, 6, 29)));
    }

    #[test]
    fn rejects_windows_beyond_a_century() {
        let p = ScanParameters {
            lookback_days: 3_000_000_000_000,
            ..Default::default()
        };
        assert_eq!(
            p.validate(),
            Err(ParamError::WindowTooLong {
                field: "lookback_days",
                value: 3_000_000_000_000,
                max: MAX_WINDOW_DAYS,
            })
        );

        let p = ScanParameters {
            exclusion_days: 200_000_000_000_000,
            ..Default::default()
        };
        assert!(matches!(
            p.validate(),
            Err(ParamError::WindowTooLong { field: "exclusion_days", .. })
        ));

        let p = ScanParameters {
            lookback_days: MAX_WINDOW_DAYS,
            exclusion_days: MAX_WINDOW_DAYS,
            ingest_margin_days: MAX_WINDOW_DAYS,
            ..Default::default()
        };
        assert_eq!(p.validate(), Ok(()));
    }

    #[test]
    fn huge_windows_saturate_instead_of_panicking() {
        let range = OutputRange::new(d(2024, 6, 3), d(2024, 6, 28)).unwrap();
        let p = ScanParameters {
            lookback_days: i64::MAX,
            exclusion_days: i64::MAX,
            ingest_margin_days: i64::MAX,
            ..Default::default()
        };
        assert_eq!(p.history_days(), i64::MAX);
        assert_eq!(range.data_start(&p), NaiveDate::MIN);
        assert_eq!(days_before(d(2024, 6, 3), 3_000_000_000_000), None);
        assert_eq!(days_before(d(2024, 6, 3), 2), Some(d(2024, 6, 1)));
    }
}
