//! Shared accumulator for points awaiting flush.
//!
//! Fetch jobs append, the flush cycle drains. Draining swaps the inner
//! vector out under the lock so a flush always works on a consistent
//! snapshot, even if jobs were to run concurrently.

use std::sync::Arc;

use parking_lot::Mutex;
use vitalsync_domain::Point;

/// Cheaply cloneable handle to the process-wide point buffer.
#[derive(Debug, Clone, Default)]
pub struct PointBuffer {
    points: Arc<Mutex<Vec<Point>>>,
}

impl PointBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, point: Point) {
        self.points.lock().push(point);
    }

    /// Append a batch, preserving order. Returns the number appended.
    pub fn extend<I>(&self, points: I) -> usize
    where
        I: IntoIterator<Item = Point>,
    {
        let mut guard = self.points.lock();
        let before = guard.len();
        guard.extend(points);
        guard.len() - before
    }

    /// Take everything buffered so far, leaving the buffer empty.
    pub fn drain(&self) -> Vec<Point> {
        std::mem::take(&mut *self.points.lock())
    }

    pub fn len(&self) -> usize {
        self.points.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.lock().is_empty()
    }
}
