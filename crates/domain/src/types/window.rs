use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, VitalSyncError};

/// Inclusive range of calendar dates (in the configured local zone) that
/// range-based fetches cover. Rebuilt on every dispatch so it advances when
/// the local date changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// # Errors
    /// Returns `VitalSyncError::InvalidInput` if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(VitalSyncError::InvalidInput(format!(
                "date window start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Window covering `end` and the `lookback_days` days before it.
    pub fn ending_on(end: NaiveDate, lookback_days: u32) -> Self {
        let start = end.checked_sub_days(Days::new(u64::from(lookback_days))).unwrap_or(end);
        Self { start, end }
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, both ends included.
    pub fn len_days(&self) -> u64 {
        (self.end - self.start).num_days().unsigned_abs() + 1
    }

    /// The date `days` before the window end (`0` is the end itself).
    pub fn days_before_end(&self, days: u32) -> NaiveDate {
        self.end.checked_sub_days(Days::new(u64::from(days))).unwrap_or(self.end)
    }

    /// Split into consecutive sub-windows of at most `max_days` days each,
    /// oldest first. `max_days == 0` is treated as unbounded.
    pub fn chunks(&self, max_days: u32) -> Vec<DateWindow> {
        if max_days == 0 || self.len_days() <= u64::from(max_days) {
            return vec![*self];
        }

        let mut chunks = Vec::new();
        let mut cursor = self.start;
        while cursor <= self.end {
            let chunk_end = cursor
                .checked_add_days(Days::new(u64::from(max_days) - 1))
                .map_or(self.end, |d| d.min(self.end));
            chunks.push(DateWindow { start: cursor, end: chunk_end });
            match chunk_end.checked_add_days(Days::new(1)) {
                Some(next) => cursor = next,
                None => break,
            }
        }
        chunks
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}
