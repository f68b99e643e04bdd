//! # VitalSync Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - HTTP transport and the retrying request engine
//! - The resilient API client and the OAuth token manager
//! - File-backed credential storage
//! - The line-protocol HTTP sink
//! - The collector scheduler and the configuration loader
//!
//! ## Architecture
//! - Implements traits defined in `vitalsync-core`
//! - Contains all "impure" code (network, files, timers)

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod scheduling;
pub mod sink;

// Re-export commonly used items
pub use api::{ApiError, ApiErrorCategory, RequestEngine, ResilientClient, RetryPolicy};
pub use auth::{FileCredentialStore, TokenManager};
pub use errors::InfraError;
pub use http::HttpClient;
pub use scheduling::{CollectorScheduler, CollectorSchedulerConfig, SchedulerError};
pub use sink::LineProtocolSink;
