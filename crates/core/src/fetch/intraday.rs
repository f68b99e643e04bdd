//! Single-day intraday series (per-second heart rate, per-minute steps).

use async_trait::async_trait;
use tracing::{debug, instrument};
use vitalsync_domain::{DetailLevel, Point, Result};

use super::json::{array_at, int_at, str_at};
use super::ports::{ApiRequester, FetchContext, FetchJob};
use super::emit;
use crate::buffer::PointBuffer;
use crate::time::{at_time_of_day, local_to_utc};

/// One intraday resource and the measurement its samples are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntradaySeries {
    /// API resource path segment (`heart`, `steps`).
    pub resource: String,
    pub measurement: String,
    pub detail: DetailLevel,
}

impl IntradaySeries {
    pub fn new(resource: impl Into<String>, measurement: impl Into<String>, detail: DetailLevel) -> Self {
        Self { resource: resource.into(), measurement: measurement.into(), detail }
    }
}

/// Fetches every configured series for the day `days_back` days before the
/// window end (`0` is today).
#[derive(Debug, Clone)]
pub struct IntradayJob {
    name: String,
    series: Vec<IntradaySeries>,
    days_back: u32,
}

impl IntradayJob {
    pub fn new(name: impl Into<String>, series: Vec<IntradaySeries>, days_back: u32) -> Self {
        Self { name: name.into(), series, days_back }
    }
}

#[async_trait]
impl FetchJob for IntradayJob {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, fields(job = %self.name))]
    async fn fetch(
        &self,
        ctx: &FetchContext,
        api: &dyn ApiRequester,
        out: &PointBuffer,
    ) -> Result<usize> {
        let day = ctx.window.days_before_end(self.days_back);
        let mut appended = 0;

        for series in &self.series {
            let path = format!(
                "/1/user/-/activities/{}/date/{day}/1d/{}.json",
                series.resource, series.detail
            );
            let Some(body) = api.get_json(&ctx.url(&path), &[]).await? else {
                continue;
            };

            let key = format!("activities-{}-intraday", series.resource);
            let samples = array_at(&body, &[key.as_str(), "dataset"]);
            debug!(resource = %series.resource, %day, samples = samples.len(), "intraday response");

            for sample in samples {
                let Some(time) = str_at(sample, "time") else {
                    continue;
                };
                let timestamp = local_to_utc(at_time_of_day(day, time)?, ctx.timezone);
                let builder = Point::builder(series.measurement.as_str(), timestamp)
                    .device(ctx.device.as_str())
                    .field_opt("value", int_at(sample, "value").map(Into::into));
                appended += usize::from(emit(out, builder));
            }
        }

        Ok(appended)
    }
}
