//! # VitalSync Core
//!
//! Pure collection logic - no HTTP, file or process code.
//!
//! This crate contains:
//! - Port interfaces (traits) for credential storage, upstream requests,
//!   fetch jobs and the metrics sink
//! - The fetch job family that maps API payloads to points
//! - The shared point buffer and the line-protocol codec
//! - Cadence bookkeeping for the scheduler
//!
//! ## Architecture Principles
//! - Only depends on `vitalsync-domain`
//! - All external effects via traits
//! - Time is injected (`Clock`, `Sleeper`) so behaviour is testable

pub mod auth;
pub mod buffer;
pub mod fetch;
pub mod line_protocol;
pub mod schedule;
pub mod sink;
pub mod time;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export specific items to avoid ambiguity
pub use auth::ports::CredentialStore;
pub use buffer::PointBuffer;
pub use fetch::ports::{ApiRequester, FetchContext, FetchJob};
pub use fetch::FetchJobSpec;
pub use schedule::{CadenceBook, TaskId};
pub use sink::ports::{FlushOutcome, MetricsSink};
pub use time::{Clock, Sleeper, SystemClock, TokioSleeper};
