//! Most recent logged activities (workouts).

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};
use vitalsync_domain::constants::{MEASUREMENT_ACTIVITY_RECORDS, RECENT_ACTIVITIES_PAGE_SIZE};
use vitalsync_domain::{FieldValue, Point, PointBuilder, Result};

use super::json::{array_at, float_at, int_at, str_at};
use super::ports::{ApiRequester, FetchContext, FetchJob};
use super::emit_all;
use crate::buffer::PointBuffer;
use crate::time::parse_api_timestamp;

/// Source key, output field, and whether the value is an integer.
const ACTIVITY_FIELDS: [(&str, &str, bool); 6] = [
    ("activeDuration", "ActiveDuration", true),
    ("averageHeartRate", "AverageHeartRate", true),
    ("calories", "calories", true),
    ("duration", "duration", true),
    ("distance", "distance", false),
    ("steps", "steps", true),
];

/// One newest-first page of activities logged before the window end.
/// Fields are only written when the activity carries them.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecentActivitiesJob;

fn activity_builder(ctx: &FetchContext, activity: &Value) -> Option<Result<PointBuilder>> {
    let start = str_at(activity, "startTime")?;
    let name = str_at(activity, "activityName").unwrap_or("Unknown");

    Some(parse_api_timestamp(start, ctx.timezone).map(|timestamp| {
        ACTIVITY_FIELDS.iter().fold(
            Point::builder(MEASUREMENT_ACTIVITY_RECORDS, timestamp).tag("ActivityName", name),
            |builder, (source, field, integer)| {
                let value = if *integer {
                    int_at(activity, source).map(FieldValue::from)
                } else {
                    float_at(activity, source).map(FieldValue::from)
                };
                builder.field_opt(*field, value)
            },
        )
    }))
}

#[async_trait]
impl FetchJob for RecentActivitiesJob {
    fn name(&self) -> &str {
        "recent_activities"
    }

    #[instrument(skip_all, fields(job = "recent_activities"))]
    async fn fetch(
        &self,
        ctx: &FetchContext,
        api: &dyn ApiRequester,
        out: &PointBuffer,
    ) -> Result<usize> {
        let params = [
            ("beforeDate", ctx.window.end().to_string()),
            ("sort", "desc".to_string()),
            ("limit", RECENT_ACTIVITIES_PAGE_SIZE.to_string()),
            ("offset", "0".to_string()),
        ];
        let Some(body) = api.get_json(&ctx.url("/1/user/-/activities/list.json"), &params).await?
        else {
            return Ok(0);
        };

        let activities = array_at(&body, &["activities"]);
        debug!(count = activities.len(), "recent activities response");
        let builders = activities
            .iter()
            .filter_map(|activity| activity_builder(ctx, activity))
            .collect::<Result<Vec<_>>>()?;
        Ok(emit_all(out, builders))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{context, StaticApi};

    #[tokio::test]
    async fn maps_present_fields_and_activity_name() {
        let api = StaticApi::new().with(
            "/1/user/-/activities/list.json",
            json!({"activities": [
                {
                    "activityName": "Outdoor Bike",
                    "startTime": "2024-01-01T08:30:00.000+01:00",
                    "activeDuration": 3_600_000,
                    "averageHeartRate": 131,
                    "calories": 712,
                    "distance": 24.31,
                    "duration": 3_650_000
                },
                {
                    "activityName": "Walk",
                    "startTime": "2023-12-31T17:00:00.000",
                    "steps": 4210
                },
                {"activityName": "Unlogged", "startTime": "2023-12-31T09:00:00.000"}
            ]}),
        );
        let out = PointBuffer::new();

        let appended = RecentActivitiesJob.fetch(&context("UTC"), &api, &out).await.unwrap();

        assert_eq!(appended, 2);
        let points = out.drain();
        let bike = &points[0];
        assert_eq!(bike.measurement(), "Activity Records");
        assert_eq!(bike.tag("ActivityName"), Some("Outdoor Bike"));
        assert_eq!(bike.device(), None);
        assert_eq!(bike.timestamp().to_rfc3339(), "2024-01-01T07:30:00+00:00");
        assert_eq!(bike.field("distance"), Some(FieldValue::Float(24.31)));
        assert_eq!(bike.field("AverageHeartRate"), Some(FieldValue::Integer(131)));
        assert_eq!(bike.field("steps"), None);

        let walk = &points[1];
        assert_eq!(walk.fields().len(), 1);
        assert_eq!(walk.field("steps"), Some(FieldValue::Integer(4210)));
    }

    #[tokio::test]
    async fn requests_one_newest_first_page_before_window_end() {
        let api = StaticApi::new();
        RecentActivitiesJob.fetch(&context("UTC"), &api, &PointBuffer::new()).await.unwrap();

        let params = api.requested_params("/1/user/-/activities/list.json");
        assert_eq!(
            params,
            vec![
                ("beforeDate".to_string(), "2024-01-01".to_string()),
                ("sort".to_string(), "desc".to_string()),
                ("limit".to_string(), "50".to_string()),
                ("offset".to_string(), "0".to_string()),
            ]
        );
    }
}
