//! Port interfaces for fetch jobs and the upstream API

use async_trait::async_trait;
use chrono_tz::Tz;
use serde_json::Value;
use vitalsync_domain::{DateWindow, Result};

use crate::buffer::PointBuffer;

/// Authenticated, retrying access to the upstream API.
#[async_trait]
pub trait ApiRequester: Send + Sync {
    /// GET `url` with query `params` and return the parsed JSON body.
    ///
    /// `Ok(None)` means the request was skipped after repeated server errors;
    /// callers treat it as "no data this tick".
    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> Result<Option<Value>>;
}

/// Everything a job needs to know about the current dispatch.
#[derive(Debug, Clone)]
pub struct FetchContext {
    /// API root without trailing slash, e.g. `https://api.fitbit.com`.
    pub api_base: String,
    /// Value for the `Device` tag.
    pub device: String,
    /// Zone the API's local timestamps are expressed in.
    pub timezone: Tz,
    /// Date range for range-based jobs; rebuilt on every dispatch.
    pub window: DateWindow,
}

impl FetchContext {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }
}

/// One category of remote data mapped to points.
#[async_trait]
pub trait FetchJob: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    /// Whether the job reads `FetchContext::window`.
    fn uses_date_window(&self) -> bool {
        true
    }

    /// Fetch and append points to `out`. Returns how many were appended.
    async fn fetch(&self, ctx: &FetchContext, api: &dyn ApiRequester, out: &PointBuffer)
        -> Result<usize>;
}
