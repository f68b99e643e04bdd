//! Port interfaces for the metrics sink

use async_trait::async_trait;
use vitalsync_domain::Point;

/// What happened to one flushed batch.
///
/// Failures are reported as [`FlushOutcome::Dropped`] rather than an error:
/// a batch is never re-queued, and a failed write must not stop polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The sink accepted the batch.
    Written { count: usize },
    /// Nothing to send; no request was made.
    Skipped,
    /// The write failed and the batch is gone.
    Dropped { count: usize, reason: String },
}

impl FlushOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// Destination for buffered points.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Write a batch. Must not make any request for an empty batch.
    async fn flush(&self, points: Vec<Point>) -> FlushOutcome;
}
