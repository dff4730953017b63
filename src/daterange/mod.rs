//! Date range filter validation.
//!
//! A [`DateRange`] can only be built with `start <= end`, so holding one is
//! proof the filter was checked before any request goes out.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::error::ValidationError;
use crate::normalize::parse_date_token;

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::StartAfterEnd { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build a range from operator input.
    ///
    /// On top of [`DateRange::new`], the end date may not lie after `today`:
    /// the service has no data for future days.
    pub fn from_user_input(
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let range = Self::new(start, end)?;
        if end > today {
            return Err(ValidationError::EndInFuture { end, today });
        }
        Ok(range)
    }

    /// The default filter: from `days` days ago up to and including `today`.
    pub fn last_days(days: u32, today: NaiveDate) -> Result<Self, ValidationError> {
        let start = window_start(today, days)?;
        Ok(Self { start, end: today })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, counting both endpoints.
    pub fn days_in_range(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Parse a date typed by the operator (CLI flag or query parameter).
pub fn parse_date_arg(raw: &str) -> Result<NaiveDate, ValidationError> {
    parse_date_token(raw).ok_or_else(|| ValidationError::InvalidDate(raw.to_string()))
}

/// Resolve optional start/end inputs against the configured default window.
///
/// A missing end defaults to `today`; a missing start defaults to
/// `default_days` before the end.
pub fn resolve(
    start: Option<&str>,
    end: Option<&str>,
    default_days: u32,
    today: NaiveDate,
) -> Result<DateRange, ValidationError> {
    let end = match end {
        Some(raw) => parse_date_arg(raw)?,
        None => today,
    };
    let start = match start {
        Some(raw) => parse_date_arg(raw)?,
        None => window_start(end, default_days)?,
    };
    DateRange::from_user_input(start, end, today)
}

/// `days` days before `end`, or an error when that leaves chrono's calendar.
fn window_start(end: NaiveDate, days: u32) -> Result<NaiveDate, ValidationError> {
    end.checked_sub_signed(Duration::days(i64::from(days)))
        .ok_or(ValidationError::WindowOutOfRange { end, days })
}
