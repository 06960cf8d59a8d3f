//! Reporting periods: calendar quarters and their inclusive date boundaries.
//!
//! All arithmetic works on [`NaiveDate`], which carries no timezone, so the
//! boundaries never shift with the locale of the process.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::DateRange;

/// Earliest year a report may be requested for.
pub const MIN_YEAR: i32 = 2000;
/// Latest year a report may be requested for.
pub const MAX_YEAR: i32 = 2100;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Caller supplied report parameters that cannot be accepted.
pub enum ValidationError {
    /// A required parameter was not supplied.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    /// Quarter outside 1-4.
    #[error("Quarter must be between 1 and 4, got {0}")]
    QuarterOutOfRange(i64),
    /// Year outside the supported range.
    #[error("Year must be between {min} and {max}, got {0}", min = MIN_YEAR, max = MAX_YEAR)]
    YearOutOfRange(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
/// Quarter of a calendar year, always within 1-4.
pub struct Quarter(u8);

impl Quarter {
    /// Validate a quarter number.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::QuarterOutOfRange`] unless `number` is 1-4.
    pub fn new(number: i64) -> Result<Self, ValidationError> {
        match u8::try_from(number) {
            Ok(valid @ 1..=4) => Ok(Self(valid)),
            _ => Err(ValidationError::QuarterOutOfRange(number)),
        }
    }

    /// Quarter number, 1-4.
    #[must_use]
    pub fn number(self) -> u8 {
        self.0
    }

    /// First calendar month of the quarter (1, 4, 7 or 10).
    #[must_use]
    pub fn first_month(self) -> u32 {
        u32::from(self.0 - 1) * 3 + 1
    }
}

impl TryFrom<i64> for Quarter {
    type Error = ValidationError;

    fn try_from(number: i64) -> Result<Self, Self::Error> {
        Self::new(number)
    }
}

impl From<Quarter> for u8 {
    fn from(quarter: Quarter) -> Self {
        quarter.0
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "Q{}", self.0)
    }
}

/// Validate a year against the supported range.
///
/// # Errors
///
/// Returns [`ValidationError::YearOutOfRange`] outside [`MIN_YEAR`]..=[`MAX_YEAR`].
pub fn validate_year(year: i64) -> Result<i32, ValidationError> {
    i32::try_from(year)
        .ok()
        .filter(|candidate| (MIN_YEAR..=MAX_YEAR).contains(candidate))
        .ok_or(ValidationError::YearOutOfRange(year))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// One quarter of one year together with its inclusive date range.
pub struct ReportPeriod {
    /// Calendar year.
    pub year: i32,
    /// Quarter of the year.
    pub quarter: Quarter,
    /// First and last day of the quarter, both inclusive.
    pub range: DateRange,
}

impl ReportPeriod {
    /// Validate raw request numbers and compute the period boundaries.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if either value is out of range.
    pub fn new(year: i64, quarter: i64) -> Result<Self, ValidationError> {
        let quarter = Quarter::new(quarter)?;
        let year = validate_year(year)?;
        Self::for_quarter(year, quarter)
    }

    /// Compute the period boundaries for an already validated quarter.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::YearOutOfRange`] if the year is unsupported.
    pub fn for_quarter(year: i32, quarter: Quarter) -> Result<Self, ValidationError> {
        let out_of_range = || ValidationError::YearOutOfRange(i64::from(year));
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(out_of_range());
        }

        let first_month = quarter.first_month();
        let start = NaiveDate::from_ymd_opt(year, first_month, 1).ok_or_else(out_of_range)?;

        // Day before the first day of the following quarter.
        let next_start = if quarter.number() == 4 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, first_month + 3, 1)
        };
        let end = next_start
            .and_then(|date| date.pred_opt())
            .ok_or_else(out_of_range)?;

        Ok(Self {
            year,
            quarter,
            range: DateRange { start, end },
        })
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} {}", self.quarter, self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn computes_quarter_boundaries() {
        let cases = [
            (1, date(2024, 1, 1), date(2024, 3, 31)),
            (2, date(2024, 4, 1), date(2024, 6, 30)),
            (3, date(2024, 7, 1), date(2024, 9, 30)),
            (4, date(2024, 10, 1), date(2024, 12, 31)),
        ];
        for (quarter, start, end) in cases {
            let period = ReportPeriod::new(2024, quarter).expect("valid period");
            assert_eq!(period.range.start, start, "start of Q{quarter}");
            assert_eq!(period.range.end, end, "end of Q{quarter}");
        }
    }

    #[test]
    fn handles_year_edges() {
        let first = ReportPeriod::new(2000, 1).expect("first supported year");
        assert_eq!(first.range.start, date(2000, 1, 1), "start");
        let last = ReportPeriod::new(2100, 4).expect("last supported year");
        assert_eq!(last.range.end, date(2100, 12, 31), "end");
    }

    #[test]
    fn first_quarter_follows_leap_years() {
        let leap = ReportPeriod::new(2024, 1).expect("valid period");
        assert!(leap.range.contains(date(2024, 2, 29)), "leap day included");
        assert_eq!(
            (leap.range.end - leap.range.start).num_days(),
            90,
            "91 days in a leap Q1"
        );

        let common = ReportPeriod::new(2023, 1).expect("valid period");
        assert_eq!(
            (common.range.end - common.range.start).num_days(),
            89,
            "90 days in a common Q1"
        );
        let century = ReportPeriod::new(2100, 1).expect("valid period");
        assert_eq!(
            (century.range.end - century.range.start).num_days(),
            89,
            "2100 is not a leap year"
        );
    }

    #[test]
    fn rejects_quarter_out_of_range() {
        assert_eq!(
            ReportPeriod::new(2024, 5),
            Err(ValidationError::QuarterOutOfRange(5)),
            "quarter 5"
        );
        assert_eq!(
            ReportPeriod::new(2024, 0),
            Err(ValidationError::QuarterOutOfRange(0)),
            "quarter 0"
        );
        assert_eq!(
            Quarter::new(-1),
            Err(ValidationError::QuarterOutOfRange(-1)),
            "negative quarter"
        );
    }

    #[test]
    fn rejects_year_out_of_range() {
        assert_eq!(
            ReportPeriod::new(1999, 1),
            Err(ValidationError::YearOutOfRange(1999)),
            "too early"
        );
        assert_eq!(
            ReportPeriod::new(i64::MAX, 1),
            Err(ValidationError::YearOutOfRange(i64::MAX)),
            "does not fit"
        );
    }

    #[test]
    fn range_contains_is_inclusive() {
        let period = ReportPeriod::new(2023, 1).expect("valid period");
        assert!(period.range.contains(date(2023, 1, 1)), "first day");
        assert!(period.range.contains(date(2023, 3, 31)), "last day");
        assert!(!period.range.contains(date(2023, 4, 1)), "next quarter");
    }
}
