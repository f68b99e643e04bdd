//! Periodic task scheduling
//!
//! One cooperative loop drives every cadence: proactive token refresh, the
//! fetch job catalog and the buffer flush.

pub mod collector_scheduler;
pub mod error;

pub use collector_scheduler::{CollectorScheduler, CollectorSchedulerConfig, CredentialRefresher};
pub use error::{SchedulerError, SchedulerResult};
