//! Flush cycle: drain the shared buffer into a sink.

pub mod ports;

use tracing::{debug, warn};

use crate::buffer::PointBuffer;
use ports::{FlushOutcome, MetricsSink};

/// Drain `buffer` and hand the snapshot to `sink`.
///
/// The buffer is emptied before the write is attempted, so a failed write
/// drops the batch (at-most-once delivery).
pub async fn drain_into(buffer: &PointBuffer, sink: &dyn MetricsSink) -> FlushOutcome {
    let points = buffer.drain();
    if points.is_empty() {
        debug!("flush skipped, buffer empty");
        return FlushOutcome::Skipped;
    }

    let outcome = sink.flush(points).await;
    if let FlushOutcome::Dropped { count, reason } = &outcome {
        warn!(count, reason = %reason, "flush dropped points");
    }
    outcome
}
