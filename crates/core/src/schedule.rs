//! Next-due bookkeeping for the cooperative scheduler.
//!
//! The book only does arithmetic on `Instant`s; the run loop that owns it
//! decides what a task is and how to wait.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Identifier of a scheduled task, unique within one book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskId {
    /// Proactive token refresh.
    TokenRefresh,
    /// Drain the point buffer into the sink.
    Flush,
    /// Fetch job by position in the job catalog.
    Fetch(usize),
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TokenRefresh => f.write_str("token_refresh"),
            Self::Flush => f.write_str("flush"),
            Self::Fetch(index) => write!(f, "fetch#{index}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    interval: Duration,
    next_due: Instant,
}

/// Cadence and next due time per task.
#[derive(Debug, Clone, Default)]
pub struct CadenceBook {
    entries: BTreeMap<TaskId, Entry>,
}

impl CadenceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. With `run_immediately` it is due at `now`, otherwise
    /// one full interval later. Re-registering replaces the cadence.
    pub fn register(&mut self, id: TaskId, interval: Duration, now: Instant, run_immediately: bool) {
        let next_due = if run_immediately { now } else { now + interval };
        self.entries.insert(id, Entry { interval, next_due });
    }

    /// Tasks due at `now`, ordered flush-last so that points produced in the
    /// same tick are flushed within it.
    pub fn due(&self, now: Instant) -> Vec<TaskId> {
        let mut due: Vec<TaskId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.next_due <= now)
            .map(|(id, _)| *id)
            .collect();
        due.sort_by_key(|id| matches!(id, TaskId::Flush));
        due
    }

    /// Record that `id` ran at `ran_at`. The next due time is one interval
    /// after `ran_at`; missed ticks are not replayed.
    pub fn mark_ran(&mut self, id: TaskId, ran_at: Instant) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.next_due = ran_at + entry.interval;
        }
    }

    /// Earliest due time across all tasks.
    pub fn next_due(&self) -> Option<Instant> {
        self.entries.values().map(|entry| entry.next_due).min()
    }

    /// Time to wait from `now` until the earliest task is due.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_due().map(|due| due.saturating_duration_since(now))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
