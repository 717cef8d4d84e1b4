//! Inclusive calendar periods used by every report.

use crate::model::ValidationError;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl Period {
    /// Builds a period, rejecting `from > to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, ValidationError> {
        if from > to {
            return Err(ValidationError::OutOfRange {
                field: "period",
                detail: format!("start {from} is after end {to}"),
            });
        }
        Ok(Self { from, to })
    }

    pub fn day(date: NaiveDate) -> Self {
        Self {
            from: date,
            to: date,
        }
    }

    pub fn month(year: i32, month: u32) -> Result<Self, ValidationError> {
        let from = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| invalid_month(year, month))?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        };
        let to = next
            .and_then(|date| date.pred_opt())
            .ok_or_else(|| invalid_month(year, month))?;
        Ok(Self { from, to })
    }

    /// First day of the month containing `date`, through `date`.
    pub fn month_to_date(date: NaiveDate) -> Self {
        Self {
            from: date - Duration::days(i64::from(date.day0())),
            to: date,
        }
    }

    /// January 1st of the year containing `date`, through `date`.
    pub fn year_to_date(date: NaiveDate) -> Self {
        Self {
            from: date - Duration::days(i64::from(date.ordinal0())),
            to: date,
        }
    }

    pub fn year(year: i32) -> Result<Self, ValidationError> {
        let from = NaiveDate::from_ymd_opt(year, 1, 1);
        let to = NaiveDate::from_ymd_opt(year, 12, 31);
        match (from, to) {
            (Some(from), Some(to)) => Ok(Self { from, to }),
            _ => Err(ValidationError::OutOfRange {
                field: "year",
                detail: format!("{year} is not a representable year"),
            }),
        }
    }

    /// Number of calendar days covered, always at least one.
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

fn invalid_month(year: i32, month: u32) -> ValidationError {
    ValidationError::OutOfRange {
        field: "month",
        detail: format!("{year}-{month} is not a calendar month"),
    }
}
