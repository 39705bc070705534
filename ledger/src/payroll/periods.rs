//! Pay periods and agreement years
//!
//! Both are anchored at the agreement start date. Pay periods are half-month
//! windows (1 - 15, 16 - end of month); from the second agreement year on,
//! the anniversary month is split at the anniversary day so that no period
//! straddles two agreement years.

use crate::config::{HALF_MONTH_LAST_DAY, PRO_RATA_DAYS_PER_MONTH};
use crate::database::{Agreement, AllowanceType};
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;

/// Last day of the month `date` falls in
pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

fn with_day_or_end(date: NaiveDate, day: u32) -> NaiveDate {
    date.with_day(day).unwrap_or_else(|| end_of_month(date))
}

/// Shift by whole years; Feb 29 clamps to Feb 28
pub fn shift_years(date: NaiveDate, years: u32) -> NaiveDate {
    date.checked_add_months(Months::new(years * 12))
        .unwrap_or(NaiveDate::MAX)
}

/// An inclusive date window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PayPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PayPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Half-month period containing `date`, ignoring any anniversary split
    pub fn current(date: NaiveDate) -> Self {
        if date.day() <= HALF_MONTH_LAST_DAY {
            Self::new(with_day_or_end(date, 1), with_day_or_end(date, HALF_MONTH_LAST_DAY))
        } else {
            Self::new(with_day_or_end(date, HALF_MONTH_LAST_DAY + 1), end_of_month(date))
        }
    }

    /// Number of days, both ends included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Exactly 1 - 15 or 16 - end of month
    pub fn is_standard(&self) -> bool {
        let first_half = self.start.day() == 1 && self.end.day() == HALF_MONTH_LAST_DAY;
        let second_half =
            self.start.day() == HALF_MONTH_LAST_DAY + 1 && self.end == end_of_month(self.start);
        first_half || second_half
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// e.g. "March 2024 (1 - 15)"
    pub fn label(&self) -> String {
        format!(
            "{} ({} - {})",
            self.start.format("%B %Y"),
            self.start.day(),
            self.end.day()
        )
    }
}

/// Every pay period from `anchor` through the one containing `as_of`.
///
/// The last period may end after `as_of`.
pub fn pay_periods(anchor: NaiveDate, as_of: NaiveDate) -> Vec<PayPeriod> {
    let day_before_anniversary = anchor.day() - 1;

    let mut periods = Vec::new();
    let mut current = anchor;

    while current <= as_of {
        let anniversary_month = current.month() == anchor.month()
            && current.year() > anchor.year()
            && day_before_anniversary > 0;

        let end = if anniversary_month && current.day() == 1 {
            with_day_or_end(current, day_before_anniversary)
        } else if current.day() <= HALF_MONTH_LAST_DAY {
            with_day_or_end(current, HALF_MONTH_LAST_DAY)
        } else {
            end_of_month(current)
        };

        periods.push(PayPeriod::new(current, end));

        match end.checked_add_days(Days::new(1)) {
            Some(next) => current = next,
            None => break,
        }
    }

    periods
}

/// Half-month windows used for allowance arrears, clipped to end before `as_of`
pub fn half_month_windows(anchor: NaiveDate, as_of: NaiveDate) -> Vec<PayPeriod> {
    let mut windows = Vec::new();
    let mut current = anchor;

    while current < as_of {
        let mut end = PayPeriod::current(current).end;
        if end >= as_of {
            end = as_of.pred_opt().unwrap_or(current);
        }

        windows.push(PayPeriod::new(current, end));

        match end.checked_add_days(Days::new(1)) {
            Some(next) => current = next,
            None => break,
        }
    }

    windows
}

/// A 12-month window anchored at the agreement start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgreementYear {
    /// 0 for the first year
    pub index: u32,
    pub start: NaiveDate,
    /// Inclusive
    pub end: NaiveDate,
}

impl AgreementYear {
    pub fn nth(anchor: NaiveDate, index: u32) -> Self {
        let start = shift_years(anchor, index);
        let end = shift_years(anchor, index + 1)
            .pred_opt()
            .unwrap_or(start);
        Self { index, start, end }
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Completed before `as_of`
    pub fn is_complete(&self, as_of: NaiveDate) -> bool {
        self.end < as_of
    }

    pub fn label(&self) -> String {
        format!(
            "Year {} ({} to {})",
            self.index + 1,
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Agreement years that started before `as_of`
pub fn agreement_years(anchor: NaiveDate, as_of: NaiveDate) -> Vec<AgreementYear> {
    (0..)
        .map(|i| AgreementYear::nth(anchor, i))
        .take_while(|year| year.start < as_of)
        .collect()
}

/// Start of the agreement year containing `date`
pub fn agreement_year_start(anchor: NaiveDate, date: NaiveDate) -> NaiveDate {
    if date < anchor {
        return anchor;
    }

    let mut years = (date.year() - anchor.year()).max(0) as u32;
    while years > 0 && shift_years(anchor, years) > date {
        years -= 1;
    }
    shift_years(anchor, years)
}

/// Allowance paid for one pay period
pub fn allowance_for_period(agreement: &Agreement, period: &PayPeriod) -> f64 {
    if !period.is_standard() && agreement.allowance_calculation_type == AllowanceType::ProRata {
        agreement.monthly_allowance / PRO_RATA_DAYS_PER_MONTH * period.days() as f64
    } else {
        agreement.monthly_allowance / 2.0
    }
}
