//! Line-protocol writer posting to an HTTP import endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use tracing::{error, info, instrument};
use vitalsync_core::line_protocol::encode_batch;
use vitalsync_core::{FlushOutcome, MetricsSink};
use vitalsync_domain::{Point, SinkConfig, VitalSyncError};

use crate::http::HttpClient;

/// Posts each batch as newline-joined line protocol (`text/plain`).
///
/// Any 2xx answer counts as written. Every other status and every transport
/// failure is logged and the batch is dropped; nothing is retried.
#[derive(Debug, Clone)]
pub struct LineProtocolSink {
    http: HttpClient,
    url: String,
}

impl LineProtocolSink {
    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }

    /// Build a sink with its own client from configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &SinkConfig) -> Result<Self, VitalSyncError> {
        let http = HttpClient::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self::new(http, config.url.clone()))
    }
}

#[async_trait]
impl MetricsSink for LineProtocolSink {
    #[instrument(skip_all, fields(points = points.len()))]
    async fn flush(&self, points: Vec<Point>) -> FlushOutcome {
        if points.is_empty() {
            return FlushOutcome::Skipped;
        }

        let count = points.len();
        let body = encode_batch(&points);
        let request = self
            .http
            .request(Method::POST, self.url.as_str())
            .header(CONTENT_TYPE, "text/plain")
            .body(body);

        match self.http.send(request).await {
            Ok(response) if response.status().is_success() => {
                info!(count, "wrote points to metrics store");
                FlushOutcome::Written { count }
            }
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                error!(count, %status, body = %text, "metrics store rejected batch");
                FlushOutcome::Dropped { count, reason: format!("HTTP {status}: {text}") }
            }
            Err(err) => {
                error!(count, error = %err, "metrics store unreachable");
                FlushOutcome::Dropped { count, reason: err.to_string() }
            }
        }
    }
}
