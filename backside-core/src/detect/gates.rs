//! Candidate gates.
//!
//! Each gate is a pure predicate over a `Candidate` and the parameters. The
//! accept decision is their conjunction, so the order they are checked in
//! only affects how early a rejection is found.

use super::mold::find_trigger;
use crate::features::FullFeatureRow;
use crate::params::ScanParameters;

/// The D0/D-1/D-2 rows for one candidate plus its absolute position.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub d0: &'a FullFeatureRow,
    pub d1: &'a FullFeatureRow,
    pub d2: &'a FullFeatureRow,
    pub position: Option<f64>,
}

impl<'a> Candidate<'a> {
    /// Candidate with D0 at `i`. Requires `i >= 2`.
    pub fn at(rows: &'a [FullFeatureRow], i: usize, position: Option<f64>) -> Option<Self> {
        if i < 2 {
            return None;
        }
        Some(Self {
            d0: rows.get(i)?,
            d1: &rows[i - 1],
            d2: &rows[i - 2],
            position,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    AbsolutePosition,
    TriggerMold,
    D1Body,
    D1Volume,
    D1VolumeRatio,
    D1AboveD2,
    D0Gap,
    D0OpenAbovePrevHigh,
    D0OpenOverEma9,
}

impl Gate {
    /// Evaluation order used by the engine: cheapest and most selective first.
    pub const ALL: [Gate; 9] = [
        Gate::AbsolutePosition,
        Gate::TriggerMold,
        Gate::D1Body,
        Gate::D1Volume,
        Gate::D1VolumeRatio,
        Gate::D1AboveD2,
        Gate::D0Gap,
        Gate::D0OpenAbovePrevHigh,
        Gate::D0OpenOverEma9,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Gate::AbsolutePosition => "absolute_position",
            Gate::TriggerMold => "trigger_mold",
            Gate::D1Body => "d1_body",
            Gate::D1Volume => "d1_volume",
            Gate::D1VolumeRatio => "d1_volume_ratio",
            Gate::D1AboveD2 => "d1_above_d2",
            Gate::D0Gap => "d0_gap",
            Gate::D0OpenAbovePrevHigh => "d0_open_above_prev_high",
            Gate::D0OpenOverEma9 => "d0_open_over_ema9",
        }
    }

    pub fn passes(&self, c: &Candidate<'_>, p: &ScanParameters) -> bool {
        match self {
            Gate::AbsolutePosition => c.position.is_some_and(|pos| pos <= p.pos_abs_max),
            Gate::TriggerMold => find_trigger(c.d1, c.d2, p).is_some(),
            Gate::D1Body => c.d1.body_over_atr.is_some_and(|b| b >= p.d1_green_atr_min),
            Gate::D1Volume => p
                .d1_volume_min
                .map_or(true, |min| c.d1.bar.volume >= min),
            Gate::D1VolumeRatio => p.d1_vol_mult_min.map_or(true, |min| {
                c.d1.volume_ratio().is_some_and(|ratio| ratio >= min)
            }),
            Gate::D1AboveD2 => {
                !p.enforce_d1_above_d2
                    || (c.d1.bar.high > c.d2.bar.high && c.d1.bar.close > c.d2.bar.close)
            }
            Gate::D0Gap => c.d0.gap_over_atr.is_some_and(|g| g >= p.gap_div_atr_min),
            // D-1's lag-1 high is the high two rows before D0.
            Gate::D0OpenAbovePrevHigh => {
                !p.require_open_above_d1_prev_high
                    || c.d1.prev_high.is_some_and(|h| c.d0.bar.open > h)
            }
            Gate::D0OpenOverEma9 => c
                .d0
                .open_over_ema9
                .is_some_and(|r| r >= p.open_over_ema9_min),
        }
    }
}

/// Conjunction of `gates`, checked in the given order.
pub fn passes_in_order(c: &Candidate<'_>, p: &ScanParameters, gates: &[Gate]) -> bool {
    gates.iter().all(|g| g.passes(c, p))
}

/// First gate in `Gate::ALL` order that rejects the candidate.
pub fn first_rejection(c: &Candidate<'_>, p: &ScanParameters) -> Option<Gate> {
    Gate::ALL.into_iter().find(|g| !g.passes(c, p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::NaiveDate;

    fn row(open: f64, high: f64, close: f64, volume: u64) -> FullFeatureRow {
        FullFeatureRow {
            bar: Bar {
                ticker: "TEST".into(),
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                open,
                high,
                low: open.min(close) - 0.1,
                close,
                volume,
            },
            prev_close: Some(10.0),
            rolling_dollar_volume20: Some(5.0e8),
            daily_range: Some(2.0),
            prev_open: Some(9.5),
            prev_high: Some(10.2),
            prev_volume: Some(20_000_000.0),
            prev2_high: Some(9.8),
            prev2_close: Some(9.6),
            ema9: Some(10.5),
            ema20: Some(9.9),
            true_range: Some(2.2),
            atr14: Some(1.0),
            vol_avg14: Some(20_000_000.0),
            dollar_vol_avg20: Some(2.0e8),
            slope9_5d: Some(6.0),
            high_over_ema9_div_atr: Some(1.5),
            gap_over_atr: Some(1.0),
            open_over_ema9: Some(1.1),
            body_over_atr: Some(1.0),
        }
    }

    fn rows() -> Vec<FullFeatureRow> {
        let d2 = row(9.6, 10.2, 10.0, 20_000_000);
        let d1 = row(10.0, 12.0, 11.8, 40_000_000);
        let d0 = row(12.5, 13.0, 12.0, 30_000_000);
        vec![d2, d1, d0]
    }

    #[test]
    fn all_gates_pass_on_clean_candidate() {
        let r = rows();
        let c = Candidate::at(&r, 2, Some(0.5)).unwrap();
        assert_eq!(first_rejection(&c, &ScanParameters::default()), None);
    }

    #[test]
    fn candidate_needs_two_prior_rows() {
        let r = rows();
        assert!(Candidate::at(&r, 1, Some(0.5)).is_none());
        assert!(Candidate::at(&r, 3, Some(0.5)).is_none());
    }

    #[test]
    fn position_gate() {
        let r = rows();
        let p = ScanParameters::default();
        assert!(!Gate::AbsolutePosition.passes(&Candidate::at(&r, 2, Some(0.9)).unwrap(), &p));
        assert!(!Gate::AbsolutePosition.passes(&Candidate::at(&r, 2, None).unwrap(), &p));
        assert!(Gate::AbsolutePosition.passes(&Candidate::at(&r, 2, Some(0.75)).unwrap(), &p));
    }

    #[test]
    fn optional_gates_disabled_by_none() {
        let mut r = rows();
        r[1].bar.volume = 10;
        let c = Candidate::at(&r, 2, Some(0.5)).unwrap();
        let p = ScanParameters {
            d1_volume_min: None,
            d1_vol_mult_min: None,
            ..Default::default()
        };
        assert!(Gate::D1Volume.passes(&c, &p));
        assert!(Gate::D1VolumeRatio.passes(&c, &p));
        assert!(!Gate::D1Volume.passes(&c, &ScanParameters::default()));
    }

    #[test]
    fn d1_volume_ratio_gate() {
        let r = rows();
        let c = Candidate::at(&r, 2, Some(0.5)).unwrap();
        // D-1 volume 40M over a 20M average = 2.0
        let pass = ScanParameters {
            d1_vol_mult_min: Some(2.0),
            ..Default::default()
        };
        let fail = ScanParameters {
            d1_vol_mult_min: Some(2.01),
            ..Default::default()
        };
        assert!(Gate::D1VolumeRatio.passes(&c, &pass));
        assert!(!Gate::D1VolumeRatio.passes(&c, &fail));
    }

    #[test]
    fn ordering_gate_needs_both_high_and_close() {
        let mut r = rows();
        r[1].bar.close = 9.9;
        let c = Candidate::at(&r, 2, Some(0.5)).unwrap();
        assert!(!Gate::D1AboveD2.passes(&c, &ScanParameters::default()));
        let relaxed = ScanParameters {
            enforce_d1_above_d2: false,
            ..Default::default()
        };
        assert!(Gate::D1AboveD2.passes(&c, &relaxed));
    }

    #[test]
    fn open_compares_against_d1_prev_high() {
        let mut r = rows();
        // D0 opens above D-2's high (10.2) but below D-1's own high (12.0)
        r[2].bar.open = 11.0;
        let c = Candidate::at(&r, 2, Some(0.5)).unwrap();
        assert!(Gate::D0OpenAbovePrevHigh.passes(&c, &ScanParameters::default()));

        r[1].prev_high = Some(11.0);
        let c = Candidate::at(&r, 2, Some(0.5)).unwrap();
        assert!(!Gate::D0OpenAbovePrevHigh.passes(&c, &ScanParameters::default()));
    }

    #[test]
    fn undefined_d0_ratio_rejects() {
        let mut r = rows();
        r[2].gap_over_atr = None;
        let c = Candidate::at(&r, 2, Some(0.5)).unwrap();
        assert_eq!(first_rejection(&c, &ScanParameters::default()), Some(Gate::D0Gap));
    }

    #[test]
    fn reversed_order_agrees() {
        let mut r = rows();
        r[0].bar.high = 20.0;
        let c = Candidate::at(&r, 2, Some(0.5)).unwrap();
        let p = ScanParameters::default();
        let mut reversed = Gate::ALL;
        reversed.reverse();
        assert_eq!(
            passes_in_order(&c, &p, &Gate::ALL),
            passes_in_order(&c, &p, &reversed)
        );
        assert!(!passes_in_order(&c, &p, &reversed));
    }
}
