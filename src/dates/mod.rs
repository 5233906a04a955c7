//! Canonical week/month/rolling-window boundary arithmetic (C1).
//!
//! Plain functions that never panic on calendar edge cases (leap years,
//! short months).

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::BudgetPeriod;

/// Which weekday a week is considered to start on. Config-driven; default `Monday`
/// per the resolved Open Question in DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    Sunday,
    Monday,
}

impl Default for WeekStart {
    fn default() -> Self {
        WeekStart::Monday
    }
}

impl WeekStart {
    fn as_weekday(&self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }
}

/// Last day of a given `(year, month)`, leap-year aware.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid calendar month");
    next.map(|n| (n - first).num_days() as u32)
        .unwrap_or(31)
}

/// Add calendar months to a date, clamping the day-of-month to the target
/// month's length (e.g. Jan 31 + 1 month = Feb 28/29).
pub fn add_months(date: DateTime<Utc>, months: i32) -> DateTime<Utc> {
    let total = date.year() * 12 + date.month() as i32 - 1 + months;
    let year = total.div_euclid(12);
    let month = (total.rem_euclid(12) + 1) as u32;
    let day = date.day().min(days_in_month(year, month));
    let naive_date = NaiveDate::from_ymd_opt(year, month, day).expect("computed calendar date");
    let naive = naive_date.and_time(date.time());
    Utc.from_utc_datetime(&naive)
}

fn start_of_day(date: DateTime<Utc>) -> DateTime<Utc> {
    date.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(date)
}

fn end_of_day(date: DateTime<Utc>) -> DateTime<Utc> {
    date.date_naive()
        .and_hms_milli_opt(23, 59, 59, 999)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(date)
}

/// `[start, end]` bounds for the week/month/year containing `reference`.
pub fn period_bounds(
    period: BudgetPeriod,
    reference: DateTime<Utc>,
    week_start: WeekStart,
) -> (DateTime<Utc>, DateTime<Utc>) {
    match period {
        BudgetPeriod::Weekly => {
            let target = week_start.as_weekday();
            let ref_day = reference.weekday();
            let days_since_start = (ref_day.num_days_from_monday() as i64
                - target.num_days_from_monday() as i64)
                .rem_euclid(7);
            let start = start_of_day(reference) - Duration::days(days_since_start);
            let end = end_of_day(start + Duration::days(6));
            (start, end)
        }
        BudgetPeriod::Monthly => {
            let year = reference.year();
            let month = reference.month();
            let start = start_of_day(
                Utc.from_utc_datetime(
                    &NaiveDate::from_ymd_opt(year, month, 1)
                        .expect("valid month")
                        .and_hms_opt(0, 0, 0)
                        .expect("midnight"),
                ),
            );
            let last_day = days_in_month(year, month);
            let end = end_of_day(
                Utc.from_utc_datetime(
                    &NaiveDate::from_ymd_opt(year, month, last_day)
                        .expect("valid last day")
                        .and_hms_opt(0, 0, 0)
                        .expect("midnight"),
                ),
            );
            (start, end)
        }
        BudgetPeriod::Yearly => {
            let year = reference.year();
            let start = start_of_day(
                Utc.from_utc_datetime(
                    &NaiveDate::from_ymd_opt(year, 1, 1)
                        .expect("jan 1")
                        .and_hms_opt(0, 0, 0)
                        .expect("midnight"),
                ),
            );
            let end = end_of_day(
                Utc.from_utc_datetime(
                    &NaiveDate::from_ymd_opt(year, 12, 31)
                        .expect("dec 31")
                        .and_hms_opt(0, 0, 0)
                        .expect("midnight"),
                ),
            );
            (start, end)
        }
    }
}

/// `[reference - days, reference]`, used by analysis engines for rolling windows.
pub fn rolling_window(days: i64, reference: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (reference - Duration::days(days), reference)
}

/// Number of whole days elapsed between `start` and `reference` (at least 1, to
/// avoid division by zero in daily-rate calculations).
pub fn days_elapsed(start: DateTime<Utc>, reference: DateTime<Utc>) -> i64 {
    (reference - start).num_days().max(1)
}

/// Total span in days between `start` and `end`, at least 1.
pub fn total_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_days().max(1)
}

/// Week start (per the configured `WeekStart`) for a given reference date.
pub fn week_start_for(reference: DateTime<Utc>, week_start: WeekStart) -> DateTime<Utc> {
    period_bounds(BudgetPeriod::Weekly, reference, week_start).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn days_in_month_is_leap_aware() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2023, 4), 30);
    }

    #[test]
    fn add_months_clamps_to_shorter_month() {
        let jan31 = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        let feb = add_months(jan31, 1);
        assert_eq!(feb.month(), 2);
        assert_eq!(feb.day(), 29);
    }

    #[test]
    fn monthly_bounds_span_full_calendar_month() {
        let reference = Utc.with_ymd_and_hms(2024, 2, 15, 10, 0, 0).unwrap();
        let (start, end) = period_bounds(BudgetPeriod::Monthly, reference, WeekStart::Monday);
        assert_eq!(start.day(), 1);
        assert_eq!(end.day(), 29);
        assert_eq!(end.month(), 2);
    }

    #[test]
    fn weekly_bounds_start_on_configured_weekday() {
        // 2024-02-15 is a Thursday.
        let reference = Utc.with_ymd_and_hms(2024, 2, 15, 10, 0, 0).unwrap();
        let (start, end) = period_bounds(BudgetPeriod::Weekly, reference, WeekStart::Monday);
        assert_eq!(start.weekday(), Weekday::Mon);
        assert_eq!((end - start).num_days(), 6);
    }

    #[test]
    fn yearly_bounds_span_jan1_to_dec31() {
        let reference = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let (start, end) = period_bounds(BudgetPeriod::Yearly, reference, WeekStart::Monday);
        assert_eq!((start.month(), start.day()), (1, 1));
        assert_eq!((end.month(), end.day()), (12, 31));
    }

    #[test]
    fn rolling_window_spans_requested_days() {
        let reference = Utc::now();
        let (start, end) = rolling_window(30, reference);
        assert_eq!(end, reference);
        assert_eq!((end - start).num_days(), 30);
    }
}
