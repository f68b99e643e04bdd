//! Time abstraction for testability
//!
//! Wall-clock reads go through [`Clock`] and every backoff or cadence wait
//! goes through [`Sleeper`], so retry and scheduling behaviour can be
//! asserted without real time passing. The helpers at the bottom convert
//! the API's zone-less local timestamps to UTC using an explicit IANA zone.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use vitalsync_domain::{Result, VitalSyncError};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;

    /// Calendar date "today" in `tz`.
    fn today_in(&self, tz: Tz) -> NaiveDate {
        self.now_utc().with_timezone(&tz).date_naive()
    }
}

/// Real system clock. Use this in production code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Suspends the current task for a duration.
///
/// Callers that need to be interruptible race the returned future against
/// their cancellation token.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Interpret a zone-less local timestamp in `tz` and convert it to UTC.
///
/// Ambiguous times (clocks going back) resolve to the earlier instant.
/// Times inside a DST gap use the offset in force at the same wall-clock
/// reading taken as UTC, which lands them just past the transition.
pub fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let offset = tz.offset_from_utc_datetime(&naive).fix();
            DateTime::from_naive_utc_and_offset(
                naive - chrono::Duration::seconds(i64::from(offset.local_minus_utc())),
                Utc,
            )
        }
    }
}

const LOCAL_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse the API's local timestamp formats (`2024-01-01T07:15:30.000`,
/// `2024-01-01 07:15:30`, `2024-01-01T07:15`).
///
/// # Errors
/// Returns `VitalSyncError::Payload` when no known format matches.
pub fn parse_local_datetime(raw: &str) -> Result<NaiveDateTime> {
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| VitalSyncError::Payload(format!("unrecognised local timestamp '{raw}'")))
}

/// Combine a date with an `HH:MM:SS` time-of-day string.
///
/// # Errors
/// Returns `VitalSyncError::Payload` for an invalid time.
pub fn at_time_of_day(date: NaiveDate, time: &str) -> Result<NaiveDateTime> {
    chrono::NaiveTime::parse_from_str(time, "%H:%M:%S")
        .map(|t| date.and_time(t))
        .map_err(|_| VitalSyncError::Payload(format!("unrecognised time of day '{time}'")))
}

/// Parse a timestamp that may carry its own UTC offset; fall back to
/// interpreting it as local time in `tz` when it does not.
///
/// # Errors
/// Returns `VitalSyncError::Payload` when neither form parses.
pub fn parse_api_timestamp(raw: &str, tz: Tz) -> Result<DateTime<Utc>> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Ok(with_offset.with_timezone(&Utc));
    }
    if let Ok(with_offset) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%:z") {
        return Ok(with_offset.with_timezone(&Utc));
    }
    parse_local_datetime(raw).map(|naive| local_to_utc(naive, tz))
}

/// Midnight of `date` in `tz`, as UTC.
pub fn start_of_day_utc(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    local_to_utc(date.and_time(chrono::NaiveTime::MIN), tz)
}
