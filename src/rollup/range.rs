use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Inclusive calendar date range a page is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start > end`. A one-day range (`start == end`) is valid.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The dashboards' default window: `lookback_days` before `today` up to
    /// `today + end_offset_days`.
    /// Offsets that leave the calendar are rejected rather than wrapped.
    pub fn trailing(today: NaiveDate, lookback_days: u32, end_offset_days: i64) -> Result<Self> {
        let start = today
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .ok_or_else(|| {
                Error::validation(format!(
                    "Lookback of {} days from {} is out of range",
                    lookback_days, today
                ))
            })?;

        let offset = Days::new(end_offset_days.unsigned_abs());
        let end = if end_offset_days >= 0 {
            today.checked_add_days(offset)
        } else {
            today.checked_sub_days(offset)
        }
        .ok_or_else(|| {
            Error::validation(format!(
                "End offset of {} days from {} is out of range",
                end_offset_days, today
            ))
        })?;

        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Dates formatted the way the usage views store them.
    pub fn bounds(&self) -> (String, String) {
        (
            self.start.format("%Y-%m-%d").to_string(),
            self.end.format("%Y-%m-%d").to_string(),
        )
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}
