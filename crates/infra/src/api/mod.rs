//! Upstream API access
//!
//! - `retry`: per-failure-class policy (pure)
//! - `engine`: the single retrying request path
//! - `auth`: bearer/basic authorization seam
//! - `client`: the `ApiRequester` handed to fetch jobs

pub mod auth;
pub mod client;
pub mod engine;
pub mod errors;
pub mod retry;

pub use auth::{AuthHandler, BasicAuth};
pub use client::ResilientClient;
pub use engine::{ApiRequest, RequestEngine};
pub use errors::{ApiError, ApiErrorCategory};
pub use retry::{RetryDecision, RetryPolicy};
