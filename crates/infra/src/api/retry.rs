//! Per-failure-class retry policy.
//!
//! One logical call keeps a single attempt counter that 401, 5xx and
//! transport failures all increment. Each class compares the shared counter
//! against its own ceiling. Rate limiting has a separate counter and never
//! touches the shared one. The token exchange runs under
//! [`RetryPolicy::for_token_exchange`], where a 401 is final.

use std::time::Duration;

use vitalsync_domain::{FailureClass, RetryConfig};

use super::errors::ApiError;

/// What the engine should do after a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Wait, then try again.
    Retry(Duration),
    /// Refresh the credential, wait, then try again.
    RefreshAndRetry(Duration),
    /// Give up quietly; the caller receives no data.
    Skip,
    /// Give up with an error.
    Fail(ApiError),
}

/// A failed attempt as seen by the policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub class: FailureClass,
    pub status: Option<u16>,
    /// `Retry-After` header value, if any.
    pub retry_after: Option<String>,
    pub message: String,
}

impl Failure {
    pub fn status(class: FailureClass, status: u16, message: impl Into<String>) -> Self {
        Self { class, status: Some(status), retry_after: None, message: message.into() }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self { class: FailureClass::Network, status: None, retry_after: None, message: message.into() }
    }

    pub fn with_retry_after(mut self, retry_after: Option<String>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

/// Counters for one logical call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Shared across the unauthorized, server and network classes.
    pub attempts: u32,
    pub rate_limited: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub expired_token_max_retry: u32,
    pub server_error_max_retry: u32,
    pub skip_on_server_error: bool,
    /// `false` turns a 401 into `AuthExchangeFailed` without using the budget.
    pub refresh_on_unauthorized: bool,
    pub network_error_max_retry: Option<u32>,
    pub rate_limit_max_retry: Option<u32>,
    pub rate_limit_padding: Duration,
    pub default_retry_after: Duration,
    pub auth_retry_delay: Duration,
    pub server_error_delay: Duration,
    pub network_error_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            expired_token_max_retry: config.expired_token_max_retry,
            server_error_max_retry: config.server_error_max_retry,
            skip_on_server_error: config.skip_on_server_error,
            refresh_on_unauthorized: true,
            network_error_max_retry: config.network_error_max_retry,
            rate_limit_max_retry: config.rate_limit_max_retry,
            rate_limit_padding: Duration::from_secs(config.rate_limit_padding_secs),
            default_retry_after: Duration::from_secs(config.default_retry_after_secs),
            auth_retry_delay: Duration::from_secs(config.auth_retry_delay_secs),
            server_error_delay: Duration::from_secs(config.server_error_delay_secs),
            network_error_delay: Duration::from_secs(config.network_error_delay_secs),
        }
    }

    /// Same delays and ceilings for the refresh-grant exchange: never
    /// skipped, and a rejected credential cannot be repaired by refreshing.
    pub fn for_token_exchange(&self) -> Self {
        Self { skip_on_server_error: false, refresh_on_unauthorized: false, ..self.clone() }
    }

    /// Classify an HTTP status. `None` means success.
    pub fn classify(status: u16) -> Option<FailureClass> {
        match status {
            200..=299 => None,
            401 => Some(FailureClass::Unauthorized),
            429 => Some(FailureClass::RateLimited),
            500 | 502 | 503 | 504 => Some(FailureClass::Server),
            _ => Some(FailureClass::Client),
        }
    }

    /// `Retry-After` (integer seconds) plus the fixed padding.
    pub fn rate_limit_delay(&self, retry_after: Option<&str>) -> Duration {
        let advertised = retry_after
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map_or(self.default_retry_after, Duration::from_secs);
        advertised + self.rate_limit_padding
    }

    /// Update `state` for `failure` and decide the next step.
    pub fn decide(&self, state: &mut RetryState, failure: Failure) -> RetryDecision {
        match failure.class {
            FailureClass::RateLimited => {
                state.rate_limited += 1;
                if self.rate_limit_max_retry.is_some_and(|max| state.rate_limited > max) {
                    return RetryDecision::Fail(ApiError::MaxRetriesExceeded {
                        class: FailureClass::RateLimited,
                        attempts: state.rate_limited,
                    });
                }
                RetryDecision::Retry(self.rate_limit_delay(failure.retry_after.as_deref()))
            }
            FailureClass::Unauthorized if !self.refresh_on_unauthorized => {
                RetryDecision::Fail(ApiError::AuthExchangeFailed(format!(
                    "token endpoint rejected the client credentials or refresh token: {}",
                    failure.message
                )))
            }
            FailureClass::Unauthorized => {
                state.attempts += 1;
                if state.attempts > self.expired_token_max_retry {
                    return RetryDecision::Fail(ApiError::AuthExpired {
                        attempts: state.attempts,
                        message: failure.message,
                    });
                }
                RetryDecision::RefreshAndRetry(self.auth_retry_delay)
            }
            FailureClass::Server => {
                state.attempts += 1;
                if state.attempts > self.server_error_max_retry {
                    if self.skip_on_server_error {
                        return RetryDecision::Skip;
                    }
                    return RetryDecision::Fail(ApiError::Server {
                        status: failure.status.unwrap_or_default(),
                        message: failure.message,
                    });
                }
                RetryDecision::Retry(self.server_error_delay)
            }
            FailureClass::Network => {
                state.attempts += 1;
                if self.network_error_max_retry.is_some_and(|max| state.attempts > max) {
                    return RetryDecision::Fail(ApiError::MaxRetriesExceeded {
                        class: FailureClass::Network,
                        attempts: state.attempts,
                    });
                }
                RetryDecision::Retry(self.network_error_delay)
            }
            FailureClass::Client => RetryDecision::Fail(ApiError::Client {
                status: failure.status.unwrap_or_default(),
                message: failure.message,
            }),
        }
    }
}
