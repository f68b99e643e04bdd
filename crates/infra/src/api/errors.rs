//! API-specific error types
//!
//! Provides error classification for upstream calls. Every variant maps onto
//! exactly one [`VitalSyncError`] so fetch jobs only ever see domain errors.

use thiserror::Error;
use vitalsync_domain::{FailureClass, VitalSyncError};

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Authentication errors (401, token endpoint rejection, missing credential)
    Authentication,
    /// Rate limiting errors (429)
    RateLimit,
    /// Server errors (5xx)
    Server,
    /// Client errors (other 4xx, undecodable body)
    Client,
    /// Network/connection errors
    Network,
    /// Local failures (configuration, storage, cancellation)
    Local,
}

/// Upstream API errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Access token rejected after {attempts} attempts: {message}")]
    AuthExpired { attempts: u32, message: String },

    #[error("Token exchange rejected: {0}")]
    AuthExchangeFailed(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Client error {status}: {message}")]
    Client { status: u16, message: String },

    #[error("Gave up on {class} failures after {attempts} attempts")]
    MaxRetriesExceeded { class: FailureClass, attempts: u32 },

    #[error("No stored credential: {0}")]
    CredentialMissing(String),

    #[error("Undecodable response: {0}")]
    Decode(String),

    #[error("Credential storage failed: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::AuthExpired { .. } | Self::AuthExchangeFailed(_) | Self::CredentialMissing(_) => {
                ApiErrorCategory::Authentication
            }
            Self::RateLimited(_) => ApiErrorCategory::RateLimit,
            Self::Server { .. } => ApiErrorCategory::Server,
            Self::Client { .. } | Self::Decode(_) => ApiErrorCategory::Client,
            Self::Network(_) => ApiErrorCategory::Network,
            Self::MaxRetriesExceeded { class, .. } => match class {
                FailureClass::RateLimited => ApiErrorCategory::RateLimit,
                FailureClass::Unauthorized => ApiErrorCategory::Authentication,
                FailureClass::Server => ApiErrorCategory::Server,
                FailureClass::Network => ApiErrorCategory::Network,
                FailureClass::Client => ApiErrorCategory::Client,
            },
            Self::Storage(_) | Self::Config(_) | Self::Cancelled => ApiErrorCategory::Local,
        }
    }

    /// Lift a domain error raised by a collaborator (credential store,
    /// transport) into the API error space.
    pub fn from_domain(err: VitalSyncError) -> Self {
        match err {
            VitalSyncError::Network(msg) => Self::Network(msg),
            VitalSyncError::RateLimited(msg) => Self::RateLimited(msg),
            VitalSyncError::AuthExpired(msg) => Self::AuthExpired { attempts: 0, message: msg },
            VitalSyncError::AuthExchangeFailed(msg) => Self::AuthExchangeFailed(msg),
            VitalSyncError::CredentialMissing(msg) => Self::CredentialMissing(msg),
            VitalSyncError::Server(msg) => Self::Server { status: 0, message: msg },
            VitalSyncError::Client(msg) => Self::Client { status: 0, message: msg },
            VitalSyncError::Payload(msg) => Self::Decode(msg),
            VitalSyncError::Storage(msg) => Self::Storage(msg),
            VitalSyncError::Cancelled => Self::Cancelled,
            VitalSyncError::Config(msg)
            | VitalSyncError::InvalidInput(msg)
            | VitalSyncError::RetriesExhausted(msg)
            | VitalSyncError::Internal(msg) => Self::Config(msg),
        }
    }
}

impl From<ApiError> for VitalSyncError {
    fn from(err: ApiError) -> Self {
        let message = err.to_string();
        match err {
            ApiError::RateLimited(_) => Self::RateLimited(message),
            ApiError::AuthExpired { .. } => Self::AuthExpired(message),
            ApiError::AuthExchangeFailed(_) => Self::AuthExchangeFailed(message),
            ApiError::Server { .. } => Self::Server(message),
            ApiError::Network(_) => Self::Network(message),
            ApiError::Client { .. } => Self::Client(message),
            ApiError::MaxRetriesExceeded { .. } => Self::RetriesExhausted(message),
            ApiError::CredentialMissing(_) => Self::CredentialMissing(message),
            ApiError::Decode(_) => Self::Payload(message),
            ApiError::Storage(_) => Self::Storage(message),
            ApiError::Config(_) => Self::Config(message),
            ApiError::Cancelled => Self::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            ApiError::AuthExpired { attempts: 6, message: "invalid_token".into() }.category(),
            ApiErrorCategory::Authentication
        );
        assert_eq!(ApiError::RateLimited("test".into()).category(), ApiErrorCategory::RateLimit);
        assert_eq!(
            ApiError::Server { status: 503, message: "test".into() }.category(),
            ApiErrorCategory::Server
        );
        assert_eq!(
            ApiError::MaxRetriesExceeded { class: FailureClass::Network, attempts: 3 }.category(),
            ApiErrorCategory::Network
        );
        assert_eq!(ApiError::Cancelled.category(), ApiErrorCategory::Local);
    }

    #[test]
    fn domain_mapping_keeps_the_failure_class() {
        let mapped: VitalSyncError =
            ApiError::Client { status: 404, message: "not found".into() }.into();
        assert!(matches!(mapped, VitalSyncError::Client(ref msg) if msg.contains("404")));

        let mapped: VitalSyncError =
            ApiError::MaxRetriesExceeded { class: FailureClass::RateLimited, attempts: 2 }.into();
        assert!(matches!(mapped, VitalSyncError::RetriesExhausted(ref msg) if msg.contains("rate_limited")));

        assert_eq!(VitalSyncError::from(ApiError::Cancelled), VitalSyncError::Cancelled);
    }

    #[test]
    fn domain_errors_lift_back() {
        assert_eq!(
            ApiError::from_domain(VitalSyncError::Network("refused".into())),
            ApiError::Network("refused".into())
        );
        assert_eq!(
            ApiError::from_domain(VitalSyncError::Storage("disk full".into())).category(),
            ApiErrorCategory::Local
        );
    }
}
