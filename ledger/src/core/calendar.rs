//! Payroll week and 4-4-5 fiscal month calendar
//!
//! Payroll weeks run Wednesday through Tuesday. Fiscal months are fixed
//! groups of payroll weeks in a repeating 4-4-5 pattern per quarter,
//! counted from an epoch week. All "month" operations in the system use
//! this calendar, never the Gregorian month.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::error::{LedgerError, LedgerResult};
use shared::{FiscalMonthId, SharedError};

/// First day of every payroll week
pub const PAYROLL_WEEK_START: Weekday = Weekday::Wed;

/// Anchor date for the standard epoch: the Wednesday on/before this date
const STANDARD_EPOCH_ANCHOR: (i32, u32, u32) = (2025, 12, 31);

/// Number of payroll weeks in each fiscal month of a quarter
const QUARTER_PATTERN: [u32; 3] = [4, 4, 5];

/// Days from the payroll week start (Wednesday = 0 .. Tuesday = 6)
fn days_into_payroll_week(weekday: Weekday) -> i64 {
    // num_days_from_monday: Mon=0 .. Sun=6; Wednesday is 2
    ((weekday.num_days_from_monday() as i64) + 7 - 2) % 7
}

/// The most recent Wednesday on or before the given date
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(days_into_payroll_week(date.weekday()))
}

/// The Tuesday ending the payroll week containing the given date
pub fn week_end_of(date: NaiveDate) -> NaiveDate {
    week_start_of(date) + Duration::days(6)
}

/// Parse a spoken/typed weekday name, including common abbreviations
pub fn parse_day_name(input: &str) -> LedgerResult<Weekday> {
    let day = match input.trim().to_lowercase().as_str() {
        "mon" | "monday" => Weekday::Mon,
        "tue" | "tues" | "tuesday" => Weekday::Tue,
        "wed" | "wednesday" => Weekday::Wed,
        "thu" | "thur" | "thurs" | "thursday" => Weekday::Thu,
        "fri" | "friday" => Weekday::Fri,
        "sat" | "saturday" => Weekday::Sat,
        "sun" | "sunday" => Weekday::Sun,
        _ => {
            return Err(LedgerError::SharedError(SharedError::UnknownDayName {
                input: input.to_string(),
            }))
        }
    };
    Ok(day)
}

/// The 4-4-5 payroll calendar anchored at a fixed epoch week
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayrollCalendar {
    epoch: NaiveDate,
}

impl PayrollCalendar {
    /// The production calendar: epoch is the Wednesday on/before 2025-12-31
    pub fn standard() -> Self {
        let (y, m, d) = STANDARD_EPOCH_ANCHOR;
        let anchor = NaiveDate::from_ymd_opt(y, m, d).expect("standard epoch anchor is valid");
        Self::with_epoch(anchor)
    }

    /// Calendar anchored at the Wednesday on/before the given date
    pub fn with_epoch(anchor: NaiveDate) -> Self {
        Self { epoch: week_start_of(anchor) }
    }

    /// Epoch week start (always a Wednesday)
    pub fn epoch(&self) -> NaiveDate {
        self.epoch
    }

    /// Zero-based payroll week index of a date, counted from the epoch week
    pub fn week_index(&self, date: NaiveDate) -> LedgerResult<i64> {
        let days = (week_start_of(date) - self.epoch).num_days();
        if days < 0 {
            return Err(LedgerError::validation(format!(
                "date {date} precedes the payroll epoch {}",
                self.epoch
            )));
        }
        Ok(days / 7)
    }

    /// Fiscal month containing a date
    pub fn month_of(&self, date: NaiveDate) -> LedgerResult<FiscalMonthId> {
        let week = self.week_index(date)?;
        let quarter = week / 13;
        let within_quarter = week % 13;
        let month_in_quarter = match within_quarter {
            0..=3 => 0,
            4..=7 => 1,
            _ => 2,
        };
        Ok(FiscalMonthId((quarter * 3 + month_in_quarter + 1) as u32))
    }

    /// Number of payroll weeks in a fiscal month (4, 4, or 5)
    pub fn weeks_in_month(&self, month: FiscalMonthId) -> u32 {
        QUARTER_PATTERN[((month.0 - 1) % 3) as usize]
    }

    /// First day (a Wednesday) of a fiscal month
    pub fn month_start(&self, month: FiscalMonthId) -> NaiveDate {
        let zero_based = (month.0 - 1) as i64;
        let quarter = zero_based / 3;
        let within = (zero_based % 3) as usize;
        let weeks_before: u32 = QUARTER_PATTERN[..within].iter().sum();
        self.epoch + Duration::weeks(quarter * 13 + weeks_before as i64)
    }

    /// Inclusive date range covered by a fiscal month
    pub fn month_range(&self, month: FiscalMonthId) -> (NaiveDate, NaiveDate) {
        let start = self.month_start(month);
        let end = start + Duration::weeks(self.weeks_in_month(month) as i64) - Duration::days(1);
        (start, end)
    }

    /// Starts of every payroll week inside a fiscal month
    pub fn month_week_starts(&self, month: FiscalMonthId) -> Vec<NaiveDate> {
        let start = self.month_start(month);
        (0..self.weeks_in_month(month))
            .map(|w| start + Duration::weeks(w as i64))
            .collect()
    }

    /// Map a spoken weekday onto its concrete date in the payroll week
    /// containing `today`. Spoken entries always land in the current week,
    /// regardless of which day name was said.
    pub fn date_for_spoken_day(&self, today: NaiveDate, day: Weekday) -> NaiveDate {
        week_start_of(today) + Duration::days(days_into_payroll_week(day))
    }
}
