//! Daily aggregate jobs over the current date window.
//!
//! Each endpoint caps how many days one request may span, so the window is
//! split into chunks of at most that size before requesting. Daily records
//! are stamped at local midnight of their `dateTime`.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, instrument};
use vitalsync_domain::constants::{
    ACTIVITY_MINUTES_MAX_RANGE_DAYS, ACTIVITY_MINUTE_TYPES, HRV_MAX_RANGE_DAYS,
    MEASUREMENT_ACTIVITY_MINUTES, MEASUREMENT_HRV, MEASUREMENT_SLEEP_SUMMARY, MEASUREMENT_SPO2,
    SLEEP_MAX_RANGE_DAYS,
};
use vitalsync_domain::{DateWindow, Point, PointBuilder, Result, VitalSyncError};

use super::json::{array_at, float_at, int_at, str_at};
use super::ports::{ApiRequester, FetchContext, FetchJob};
use super::emit_all;
use crate::buffer::PointBuffer;
use crate::time::{parse_api_timestamp, start_of_day_utc};

fn record_date(record: &Value) -> Result<NaiveDate> {
    let raw = str_at(record, "dateTime")
        .ok_or_else(|| VitalSyncError::Payload("daily record without dateTime".into()))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| VitalSyncError::Payload(format!("invalid dateTime '{raw}'")))
}

fn daily_builder(ctx: &FetchContext, measurement: &str, record: &Value) -> Result<PointBuilder> {
    let timestamp = start_of_day_utc(record_date(record)?, ctx.timezone);
    Ok(Point::builder(measurement, timestamp).device(ctx.device.as_str()))
}

/// Float fields under the record's `value` object.
fn value_floats(mut builder: PointBuilder, record: &Value, keys: &[&str]) -> PointBuilder {
    let value = record.get("value").unwrap_or(&Value::Null);
    for key in keys {
        builder = builder.field_opt(*key, float_at(value, key).map(Into::into));
    }
    builder
}

async fn request_range(
    ctx: &FetchContext,
    api: &dyn ApiRequester,
    path_prefix: &str,
    range: DateWindow,
) -> Result<Option<Value>> {
    let url = ctx.url(&format!("{path_prefix}/date/{}/{}.json", range.start(), range.end()));
    api.get_json(&url, &[]).await
}

/// Heart-rate variability, at most 30 days per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct HrvJob;

#[async_trait]
impl FetchJob for HrvJob {
    fn name(&self) -> &str {
        "hrv"
    }

    #[instrument(skip_all, fields(job = "hrv", window = %ctx.window))]
    async fn fetch(&self, ctx: &FetchContext, api: &dyn ApiRequester, out: &PointBuffer) -> Result<usize> {
        let mut appended = 0;
        for range in ctx.window.chunks(HRV_MAX_RANGE_DAYS) {
            let Some(body) = request_range(ctx, api, "/1/user/-/hrv", range).await? else {
                continue;
            };
            let builders = array_at(&body, &["hrv"])
                .iter()
                .map(|record| {
                    daily_builder(ctx, MEASUREMENT_HRV, record)
                        .map(|b| value_floats(b, record, &["dailyRmssd", "deepRmssd"]))
                })
                .collect::<Result<Vec<_>>>()?;
            appended += emit_all(out, builders);
        }
        Ok(appended)
    }
}

/// Sleep log summaries, at most 100 days per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepJob;

const SLEEP_FIELDS: [(&str, &str); 6] = [
    ("efficiency", "efficiency"),
    ("minutesAfterWakeup", "minutesAfterWakeup"),
    ("minutesAsleep", "minutesAsleep"),
    ("minutesToFallAsleep", "minutesToFallAsleep"),
    ("minutesInBed", "timeInBed"),
    ("minutesAwake", "minutesAwake"),
];

fn sleep_builder(ctx: &FetchContext, record: &Value) -> Result<PointBuilder> {
    let start = str_at(record, "startTime")
        .ok_or_else(|| VitalSyncError::Payload("sleep record without startTime".into()))?;
    let main_sleep = record.get("isMainSleep").and_then(Value::as_bool).unwrap_or(false);

    let mut builder = Point::builder(MEASUREMENT_SLEEP_SUMMARY, parse_api_timestamp(start, ctx.timezone)?)
        .device(ctx.device.as_str())
        .tag("isMainSleep", if main_sleep { "True" } else { "False" });
    for (field, source) in SLEEP_FIELDS {
        builder = builder.field_opt(field, int_at(record, source).map(Into::into));
    }
    Ok(builder)
}

#[async_trait]
impl FetchJob for SleepJob {
    fn name(&self) -> &str {
        "sleep"
    }

    #[instrument(skip_all, fields(job = "sleep", window = %ctx.window))]
    async fn fetch(&self, ctx: &FetchContext, api: &dyn ApiRequester, out: &PointBuffer) -> Result<usize> {
        let mut appended = 0;
        for range in ctx.window.chunks(SLEEP_MAX_RANGE_DAYS) {
            let Some(body) = request_range(ctx, api, "/1.2/user/-/sleep", range).await? else {
                continue;
            };
            let builders = array_at(&body, &["sleep"])
                .iter()
                .map(|record| sleep_builder(ctx, record))
                .collect::<Result<Vec<_>>>()?;
            appended += emit_all(out, builders);
        }
        Ok(appended)
    }
}

/// Daily minutes per activity intensity, at most 365 days per request.
#[derive(Debug, Clone)]
pub struct ActivityMinutesJob {
    kinds: Vec<String>,
}

impl ActivityMinutesJob {
    pub fn new(kinds: Vec<String>) -> Self {
        Self { kinds }
    }
}

impl Default for ActivityMinutesJob {
    fn default() -> Self {
        Self::new(ACTIVITY_MINUTE_TYPES.iter().map(ToString::to_string).collect())
    }
}

#[async_trait]
impl FetchJob for ActivityMinutesJob {
    fn name(&self) -> &str {
        "activity_minutes"
    }

    #[instrument(skip_all, fields(job = "activity_minutes", window = %ctx.window))]
    async fn fetch(&self, ctx: &FetchContext, api: &dyn ApiRequester, out: &PointBuffer) -> Result<usize> {
        let mut appended = 0;
        for kind in &self.kinds {
            let prefix = format!("/1/user/-/activities/tracker/{kind}");
            let key = format!("activities-tracker-{kind}");
            for range in ctx.window.chunks(ACTIVITY_MINUTES_MAX_RANGE_DAYS) {
                let Some(body) = request_range(ctx, api, &prefix, range).await? else {
                    continue;
                };
                let builders = array_at(&body, &[key.as_str()])
                    .iter()
                    .map(|record| {
                        daily_builder(ctx, MEASUREMENT_ACTIVITY_MINUTES, record).map(|b| {
                            b.field_opt(kind.as_str(), int_at(record, "value").map(Into::into))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                appended += emit_all(out, builders);
            }
        }
        debug!(appended, "activity minutes collected");
        Ok(appended)
    }
}

/// Blood oxygen saturation. The endpoint has no range limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spo2Job;

#[async_trait]
impl FetchJob for Spo2Job {
    fn name(&self) -> &str {
        "spo2"
    }

    #[instrument(skip_all, fields(job = "spo2", window = %ctx.window))]
    async fn fetch(&self, ctx: &FetchContext, api: &dyn ApiRequester, out: &PointBuffer) -> Result<usize> {
        let Some(body) = request_range(ctx, api, "/1/user/-/spo2", ctx.window).await? else {
            return Ok(0);
        };
        let records = body.as_array().map_or(&[][..], Vec::as_slice);
        let builders = records
            .iter()
            .map(|record| {
                daily_builder(ctx, MEASUREMENT_SPO2, record)
                    .map(|b| value_floats(b, record, &["avg", "max", "min"]))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(emit_all(out, builders))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;
    use vitalsync_domain::FieldValue;

    use super::*;
    use crate::testing::{context, StaticApi};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn hrv_maps_float_fields_at_local_midnight() {
        let api = StaticApi::new().with(
            "/1/user/-/hrv/date/2023-12-31/2024-01-01.json",
            json!({"hrv": [
                {"dateTime": "2023-12-31", "value": {"dailyRmssd": 34.7, "deepRmssd": 31}},
                {"dateTime": "2024-01-01", "value": {}}
            ]}),
        );
        let out = PointBuffer::new();
        let mut ctx = context("Asia/Tokyo");
        ctx.window = DateWindow::ending_on(date(2024, 1, 1), 1);

        assert_eq!(HrvJob.fetch(&ctx, &api, &out).await.unwrap(), 1);
        let point = &out.drain()[0];
        assert_eq!(point.measurement(), "HRV");
        assert_eq!(point.field("dailyRmssd"), Some(FieldValue::Float(34.7)));
        assert_eq!(point.field("deepRmssd"), Some(FieldValue::Float(31.0)));
        assert_eq!(point.timestamp().to_rfc3339(), "2023-12-30T15:00:00+00:00");
    }

    #[tokio::test]
    async fn hrv_splits_long_windows_into_thirty_day_requests() {
        let api = StaticApi::new();
        let mut ctx = context("UTC");
        ctx.window = DateWindow::new(date(2024, 1, 1), date(2024, 3, 1)).unwrap();

        HrvJob.fetch(&ctx, &api, &PointBuffer::new()).await.unwrap();

        assert_eq!(
            api.requested_paths(),
            vec![
                "/1/user/-/hrv/date/2024-01-01/2024-01-30.json",
                "/1/user/-/hrv/date/2024-01-31/2024-02-29.json",
                "/1/user/-/hrv/date/2024-03-01/2024-03-01.json",
            ]
        );
    }

    #[tokio::test]
    async fn sleep_summary_renames_time_in_bed_and_tags_main_sleep() {
        let api = StaticApi::new().with(
            "/1.2/user/-/sleep/date/2024-01-01/2024-01-01.json",
            json!({"sleep": [{
                "startTime": "2024-01-01T23:05:30.000",
                "isMainSleep": true,
                "efficiency": 93,
                "minutesAfterWakeup": 2,
                "minutesAsleep": 412,
                "minutesToFallAsleep": 0,
                "timeInBed": 455,
                "minutesAwake": 43
            }]}),
        );
        let out = PointBuffer::new();

        assert_eq!(SleepJob.fetch(&context("UTC"), &api, &out).await.unwrap(), 1);
        let point = &out.drain()[0];
        assert_eq!(point.measurement(), "Sleep Summary");
        assert_eq!(point.tag("isMainSleep"), Some("True"));
        assert_eq!(point.field("minutesInBed"), Some(FieldValue::Integer(455)));
        assert_eq!(point.field("minutesToFallAsleep"), Some(FieldValue::Integer(0)));
        assert_eq!(point.fields().len(), 6);
        assert!(point.fields().values().all(FieldValue::is_integer));
    }

    #[tokio::test]
    async fn activity_minutes_parse_string_values_per_type() {
        let api = StaticApi::new()
            .with(
                "/1/user/-/activities/tracker/minutesSedentary/date/2024-01-01/2024-01-01.json",
                json!({"activities-tracker-minutesSedentary": [{"dateTime": "2024-01-01", "value": "712"}]}),
            )
            .with(
                "/1/user/-/activities/tracker/minutesVeryActive/date/2024-01-01/2024-01-01.json",
                json!({"activities-tracker-minutesVeryActive": [{"dateTime": "2024-01-01", "value": "31"}]}),
            );
        let out = PointBuffer::new();

        let appended = ActivityMinutesJob::default().fetch(&context("UTC"), &api, &out).await.unwrap();

        assert_eq!(appended, 2);
        assert_eq!(api.requested_paths().len(), 4);
        let points = out.drain();
        assert_eq!(points[0].field("minutesSedentary"), Some(FieldValue::Integer(712)));
        assert_eq!(points[1].field("minutesVeryActive"), Some(FieldValue::Integer(31)));
        assert!(points.iter().all(|p| p.measurement() == "Activity Minutes"));
    }

    #[tokio::test]
    async fn spo2_reads_top_level_list_in_one_request() {
        let api = StaticApi::new().with(
            "/1/user/-/spo2/date/2023-01-01/2024-01-01.json",
            json!([{"dateTime": "2024-01-01", "value": {"avg": 95.6, "min": 92.1, "max": 98}}]),
        );
        let out = PointBuffer::new();
        let mut ctx = context("UTC");
        ctx.window = DateWindow::new(date(2023, 1, 1), date(2024, 1, 1)).unwrap();

        assert_eq!(Spo2Job.fetch(&ctx, &api, &out).await.unwrap(), 1);
        let point = &out.drain()[0];
        assert_eq!(point.field("max"), Some(FieldValue::Float(98.0)));
        assert_eq!(point.field("avg"), Some(FieldValue::Float(95.6)));
        assert_eq!(api.requested_paths().len(), 1);
    }

    #[tokio::test]
    async fn malformed_date_is_a_payload_error() {
        let api = StaticApi::new().with(
            "/1/user/-/spo2/date/2024-01-01/2024-01-01.json",
            json!([{"dateTime": "01/01/2024", "value": {"avg": 95.0}}]),
        );
        let err = Spo2Job.fetch(&context("UTC"), &api, &PointBuffer::new()).await.unwrap_err();
        assert!(matches!(err, VitalSyncError::Payload(_)));
    }
}
