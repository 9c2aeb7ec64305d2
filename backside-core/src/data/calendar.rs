//! Trading-day calendar.
//!
//! `UsEquityCalendar` is weekdays minus the NYSE full-day holidays, plus any
//! extra closures supplied by configuration (market emergencies, national days
//! of mourning). Early closes are still trading days.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CalendarError {
    #[error("calendar range start {start} is after end {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("no trading days between {start} and {end}")]
    Empty { start: NaiveDate, end: NaiveDate },
}

/// Source of valid trading days.
pub trait TradingCalendar: Send + Sync {
    fn is_trading_day(&self, date: NaiveDate) -> bool;

    /// Ordered trading days in the inclusive range `[start, end]`.
    fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, CalendarError> {
        if start > end {
            return Err(CalendarError::InvertedRange { start, end });
        }
        let days: Vec<NaiveDate> = start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| self.is_trading_day(*d))
            .collect();
        if days.is_empty() {
            return Err(CalendarError::Empty { start, end });
        }
        Ok(days)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UsEquityCalendar {
    extra_closures: BTreeSet<NaiveDate>,
}

impl UsEquityCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_closures(closures: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            extra_closures: closures.into_iter().collect(),
        }
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.extra_closures.contains(&date) || holidays(date.year()).contains(&date)
    }
}

impl TradingCalendar for UsEquityCalendar {
    fn is_trading_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.is_holiday(date)
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Saturday holidays are observed Friday, Sunday holidays Monday.
fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `n`-th `weekday` of the month (1-based).
fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_next = if month == 12 {
        ymd(year + 1, 1, 1)?
    } else {
        ymd(year, month + 1, 1)?
    };
    let mut d = first_next - Duration::days(1);
    while d.weekday() != weekday {
        d -= Duration::days(1);
    }
    Some(d)
}

/// Gregorian Easter Sunday (anonymous Gregorian algorithm).
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    ymd(year, month as u32, day as u32)
}

/// Full-day NYSE closures for `year`.
fn holidays(year: i32) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(10);

    // New Year's Day falling on Saturday is not observed on the prior Friday.
    if let Some(d) = ymd(year, 1, 1) {
        if d.weekday() != Weekday::Sat {
            out.push(observed(d));
        }
    }
    out.extend(nth_weekday(year, 1, Weekday::Mon, 3));
    out.extend(nth_weekday(year, 2, Weekday::Mon, 3));
    out.extend(easter_sunday(year).map(|e| e - Duration::days(2)));
    out.extend(last_weekday(year, 5, Weekday::Mon));
    if year >= 2022 {
        out.extend(ymd(year, 6, 19).map(observed));
    }
    out.extend(ymd(year, 7, 4).map(observed));
    out.extend(nth_weekday(year, 9, Weekday::Mon, 1));
    out.extend(nth_weekday(year, 11, Weekday::Thu, 4));
    out.extend(ymd(year, 12, 25).map(observed));
    out
}
