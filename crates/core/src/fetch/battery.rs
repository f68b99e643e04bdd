//! Device battery level snapshot.

use async_trait::async_trait;
use tracing::{debug, instrument};
use vitalsync_domain::constants::MEASUREMENT_BATTERY;
use vitalsync_domain::{Point, Result};

use super::json::{float_at, str_at};
use super::ports::{ApiRequester, FetchContext, FetchJob};
use super::emit;
use crate::buffer::PointBuffer;
use crate::time::parse_api_timestamp;

/// Reads the first paired device and records its battery level at the
/// device's last sync time.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatteryJob;

#[async_trait]
impl FetchJob for BatteryJob {
    fn name(&self) -> &str {
        "battery"
    }

    fn uses_date_window(&self) -> bool {
        false
    }

    #[instrument(skip_all, fields(job = "battery"))]
    async fn fetch(
        &self,
        ctx: &FetchContext,
        api: &dyn ApiRequester,
        out: &PointBuffer,
    ) -> Result<usize> {
        let Some(body) = api.get_json(&ctx.url("/1/user/-/devices.json"), &[]).await? else {
            return Ok(0);
        };
        let Some(device) = body.as_array().and_then(|devices| devices.first()) else {
            debug!("no paired devices");
            return Ok(0);
        };
        let Some(synced) = str_at(device, "lastSyncTime") else {
            debug!("device has no lastSyncTime");
            return Ok(0);
        };

        let timestamp = parse_api_timestamp(synced, ctx.timezone)?;
        let builder = Point::builder(MEASUREMENT_BATTERY, timestamp)
            .device(&ctx.device)
            .field_opt("value", float_at(device, "batteryLevel").map(Into::into));
        Ok(usize::from(emit(out, builder)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vitalsync_domain::FieldValue;

    use super::*;
    use crate::testing::{context, StaticApi};

    #[tokio::test]
    async fn records_first_device_battery_as_float() {
        let api = StaticApi::new().with(
            "/1/user/-/devices.json",
            json!([
                {"batteryLevel": 80, "lastSyncTime": "2024-01-01T10:15:00.000", "deviceVersion": "Charge 6"},
                {"batteryLevel": 5, "lastSyncTime": "2024-01-01T09:00:00.000"}
            ]),
        );
        let out = PointBuffer::new();
        let ctx = context("Europe/Berlin");

        assert_eq!(BatteryJob.fetch(&ctx, &api, &out).await.unwrap(), 1);

        let point = &out.drain()[0];
        assert_eq!(point.measurement(), "DeviceBatteryLevel");
        assert_eq!(point.field("value"), Some(FieldValue::Float(80.0)));
        assert_eq!(point.device(), Some("Charge6"));
        assert_eq!(point.timestamp().to_rfc3339(), "2024-01-01T09:15:00+00:00");
    }

    #[tokio::test]
    async fn empty_device_list_yields_nothing() {
        let api = StaticApi::new().with("/1/user/-/devices.json", json!([]));
        let out = PointBuffer::new();
        assert_eq!(BatteryJob.fetch(&context("UTC"), &api, &out).await.unwrap(), 0);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn skipped_request_yields_nothing() {
        let api = StaticApi::new().skipping("/1/user/-/devices.json");
        let out = PointBuffer::new();
        assert_eq!(BatteryJob.fetch(&context("UTC"), &api, &out).await.unwrap(), 0);
    }
}
