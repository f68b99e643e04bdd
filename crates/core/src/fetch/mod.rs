//! Fetch job family.
//!
//! Each job knows one upstream payload shape and maps it to points.
//! Jobs hold no mutable state; the only thing they write to is the shared
//! [`PointBuffer`] passed in by the scheduler.

pub mod activities;
pub mod battery;
pub mod daily;
pub mod intraday;
pub mod json;
pub mod ports;

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use vitalsync_domain::constants::{MEASUREMENT_HEART_RATE_INTRADAY, MEASUREMENT_STEPS_INTRADAY};
use vitalsync_domain::{PointBuilder, ScheduleConfig};

pub use activities::RecentActivitiesJob;
pub use battery::BatteryJob;
pub use daily::{ActivityMinutesJob, HrvJob, SleepJob, Spo2Job};
pub use intraday::{IntradayJob, IntradaySeries};
use ports::FetchJob;

use crate::buffer::PointBuffer;

/// A job together with its cadence.
#[derive(Clone)]
pub struct FetchJobSpec {
    pub name: String,
    pub interval: Duration,
    pub job: Arc<dyn FetchJob>,
}

impl FetchJobSpec {
    pub fn new(interval: Duration, job: Arc<dyn FetchJob>) -> Self {
        Self { name: job.name().to_string(), interval, job }
    }

    pub fn uses_date_window(&self) -> bool {
        self.job.uses_date_window()
    }
}

impl std::fmt::Debug for FetchJobSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchJobSpec")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("uses_date_window", &self.uses_date_window())
            .finish()
    }
}

/// Heart rate and steps at the resolutions configured in `schedule`.
pub fn intraday_series(schedule: &ScheduleConfig) -> Vec<IntradaySeries> {
    vec![
        IntradaySeries::new("heart", MEASUREMENT_HEART_RATE_INTRADAY, schedule.heart_rate_detail),
        IntradaySeries::new("steps", MEASUREMENT_STEPS_INTRADAY, schedule.steps_detail),
    ]
}

/// The full polling catalog with cadences taken from `schedule`.
pub fn default_catalog(schedule: &ScheduleConfig) -> Vec<FetchJobSpec> {
    let secs = Duration::from_secs;
    vec![
        FetchJobSpec::new(
            secs(schedule.intraday_today_interval_secs),
            Arc::new(IntradayJob::new("intraday_today", intraday_series(schedule), 0)),
        ),
        FetchJobSpec::new(
            secs(schedule.intraday_yesterday_interval_secs),
            Arc::new(IntradayJob::new("intraday_yesterday", intraday_series(schedule), 1)),
        ),
        FetchJobSpec::new(secs(schedule.battery_interval_secs), Arc::new(BatteryJob)),
        FetchJobSpec::new(secs(schedule.hrv_interval_secs), Arc::new(HrvJob)),
        FetchJobSpec::new(secs(schedule.sleep_interval_secs), Arc::new(SleepJob)),
        FetchJobSpec::new(
            secs(schedule.activity_minutes_interval_secs),
            Arc::new(ActivityMinutesJob::default()),
        ),
        FetchJobSpec::new(secs(schedule.spo2_interval_secs), Arc::new(Spo2Job)),
        FetchJobSpec::new(
            secs(schedule.recent_activities_interval_secs),
            Arc::new(RecentActivitiesJob),
        ),
    ]
}

/// Build `builder` and append it, skipping records that carry no numeric
/// field. Returns whether a point was appended.
pub(crate) fn emit(out: &PointBuffer, builder: PointBuilder) -> bool {
    if !builder.has_fields() {
        return false;
    }
    match builder.build() {
        Ok(point) => {
            out.push(point);
            true
        }
        Err(err) => {
            warn!(error = %err, "dropping invalid record");
            false
        }
    }
}

/// Append all points, returning the count.
pub(crate) fn emit_all(out: &PointBuffer, builders: impl IntoIterator<Item = PointBuilder>) -> usize {
    builders.into_iter().map(|builder| emit(out, builder)).filter(|appended| *appended).count()
}

#[cfg(test)]
mod tests {
    use vitalsync_domain::{DetailLevel, ScheduleConfig};

    use super::*;

    #[test]
    fn catalog_uses_configured_cadences() {
        let schedule = ScheduleConfig { battery_interval_secs: 60, ..Default::default() };
        let catalog = default_catalog(&schedule);

        let names: Vec<_> = catalog.iter().map(|spec| spec.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "intraday_today",
                "intraday_yesterday",
                "battery",
                "hrv",
                "sleep",
                "activity_minutes",
                "spo2",
                "recent_activities",
            ]
        );
        let battery = catalog.iter().find(|spec| spec.name == "battery").unwrap();
        assert_eq!(battery.interval, Duration::from_secs(60));
        assert!(!battery.uses_date_window());
        assert_eq!(catalog[0].interval, Duration::from_secs(180));
    }

    #[test]
    fn intraday_series_follow_configured_detail() {
        let schedule = ScheduleConfig {
            heart_rate_detail: DetailLevel::FiveMinutes,
            steps_detail: DetailLevel::FifteenMinutes,
            ..Default::default()
        };

        let series = intraday_series(&schedule);
        assert_eq!(series[0].resource, "heart");
        assert_eq!(series[0].detail, DetailLevel::FiveMinutes);
        assert_eq!(series[1].resource, "steps");
        assert_eq!(series[1].detail, DetailLevel::FifteenMinutes);
    }
}
