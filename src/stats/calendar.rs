use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::Trade;

/// A calendar month, written `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalendarMonth {
    first_day: NaiveDate,
}

impl CalendarMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, AppError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first_day| CalendarMonth { first_day })
            .ok_or_else(|| AppError::Validation(format!("invalid month {}-{:02}", year, month)))
    }

    pub fn containing(date: NaiveDate) -> Self {
        CalendarMonth {
            first_day: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn last_day(&self) -> NaiveDate {
        let next = self
            .first_day
            .checked_add_months(chrono::Months::new(1))
            .unwrap_or(NaiveDate::MAX);
        next.pred_opt().unwrap_or(next)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.last_day();
        self.first_day.iter_days().take_while(move |d| *d <= last)
    }

    /// First and last instant of the month, for the store query
    pub fn bounds(&self) -> (NaiveDateTime, NaiveDateTime) {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        (
            self.first_day.and_time(NaiveTime::MIN),
            self.last_day().and_time(end_of_day),
        )
    }
}

impl fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first_day.format("%Y-%m"))
    }
}

impl FromStr for CalendarMonth {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::Validation(format!("month must look like YYYY-MM, got '{}'", s));

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        CalendarMonth::new(year, month)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPnl {
    pub date: NaiveDate,
    pub pnl: Decimal,
    pub trade_count: usize,
    /// False when the day's trades net to exactly zero, same as an empty day
    pub has_trade: bool,
}

/// Sum of the month's daily totals
pub fn month_total(days: &[DayPnl]) -> Decimal {
    days.iter().map(|d| d.pnl).fold(Decimal::ZERO, Decimal::saturating_add)
}

/// One entry per calendar day of `month`, with the P&L of trades executed that day.
/// Trades outside the month are ignored.
pub fn month_pnl(month: CalendarMonth, trades: &[Trade]) -> Vec<DayPnl> {
    month
        .days()
        .map(|day| {
            let (pnl, trade_count) = trades
                .iter()
                .filter(|t| t.executed_at.date() == day)
                .fold((Decimal::ZERO, 0), |(sum, n), t| (sum.saturating_add(t.net_pnl), n + 1));

            DayPnl {
                date: day,
                pnl,
                trade_count,
                has_trade: !pnl.is_zero(),
            }
        })
        .collect()
}
