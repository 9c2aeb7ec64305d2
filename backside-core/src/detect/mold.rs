//! Trigger mold: the composite expansion check that arms a candidate.

use crate::domain::TriggerTag;
use crate::features::FullFeatureRow;
use crate::params::{ScanParameters, TriggerMode};

/// True iff every mold predicate holds on `row`. Any undefined input fails.
pub fn satisfies_mold(row: &FullFeatureRow, params: &ScanParameters) -> bool {
    mold_check(row, params).unwrap_or(false)
}

fn mold_check(row: &FullFeatureRow, p: &ScanParameters) -> Option<bool> {
    let prev_close = row.prev_close?;
    let adv = row.dollar_vol_avg20?;
    row.vol_avg14.filter(|v| *v > 0.0)?;

    Some(
        prev_close >= p.price_min
            && adv >= p.adv_min
            && row.atr_ratio()? >= p.atr_mult
            && row.volume_signal()? >= p.vol_mult
            && row.slope9_5d? >= p.slope_min
            && row.high_over_ema9_div_atr? >= p.high_ema9_mult,
    )
}

/// Find the row that arms the candidate, D-1 first.
pub fn find_trigger(
    d1: &FullFeatureRow,
    d2: &FullFeatureRow,
    params: &ScanParameters,
) -> Option<TriggerTag> {
    if satisfies_mold(d1, params) {
        return Some(TriggerTag::DMinus1);
    }
    match params.trigger_mode {
        TriggerMode::D1Only => None,
        TriggerMode::D1OrD2 => satisfies_mold(d2, params).then_some(TriggerTag::DMinus2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::NaiveDate;

    /// A row that satisfies the default mold comfortably.
    fn armed_row() -> FullFeatureRow {
        FullFeatureRow {
            bar: Bar {
                ticker: "TEST".into(),
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                open: 10.0,
                high: 12.0,
                low: 9.8,
                close: 11.8,
                volume: 40_000_000,
            },
            prev_close: Some(10.0),
            rolling_dollar_volume20: Some(5.0e8),
            daily_range: Some(2.2),
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
            gap_over_atr: Some(0.0),
            open_over_ema9: Some(0.95),
            body_over_atr: Some(1.8),
        }
    }

    #[test]
    fn armed_row_satisfies_default_mold() {
        assert!(satisfies_mold(&armed_row(), &ScanParameters::default()));
    }

    #[test]
    fn each_predicate_can_fail() {
        let p = ScanParameters::default();
        let breakers: Vec<fn(&mut FullFeatureRow)> = vec![
            |r| r.prev_close = Some(1.0),
            |r| r.dollar_vol_avg20 = Some(1.0),
            |r| r.vol_avg14 = Some(0.0),
            |r| r.true_range = Some(0.1),
            |r| {
                r.bar.volume = 1;
                r.prev_volume = Some(1.0);
            },
            |r| r.slope9_5d = Some(0.0),
            |r| r.high_over_ema9_div_atr = Some(0.2),
        ];
        for (i, brk) in breakers.into_iter().enumerate() {
            let mut r = armed_row();
            brk(&mut r);
            assert!(!satisfies_mold(&r, &p), "predicate {i} should fail");
        }
    }

    #[test]
    fn undefined_field_fails() {
        let mut r = armed_row();
        r.slope9_5d = None;
        assert!(!satisfies_mold(&r, &ScanParameters::default()));
    }

    #[test]
    fn d2_only_consulted_in_d1_or_d2_mode() {
        let mut d1 = armed_row();
        d1.slope9_5d = Some(-1.0);
        let d2 = armed_row();

        let either = ScanParameters::default();
        assert_eq!(find_trigger(&d1, &d2, &either), Some(TriggerTag::DMinus2));

        let only = ScanParameters {
            trigger_mode: TriggerMode::D1Only,
            ..Default::default()
        };
        assert_eq!(find_trigger(&d1, &d2, &only), None);
    }

    #[test]
    fn d1_takes_precedence() {
        let r = armed_row();
        assert_eq!(
            find_trigger(&r, &r, &ScanParameters::default()),
            Some(TriggerTag::DMinus1)
        );
    }
}
