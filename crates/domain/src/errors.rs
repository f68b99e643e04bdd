//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for VitalSync
///
/// This is the error that crosses port boundaries (core traits). Transport
/// specific errors live in the infrastructure crate and are folded into one
/// of these variants.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum VitalSyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Authentication expired: {0}")]
    AuthExpired(String),

    #[error("Token exchange failed: {0}")]
    AuthExchangeFailed(String),

    #[error("No stored credential: {0}")]
    CredentialMissing(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Retry limit exceeded: {0}")]
    RetriesExhausted(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unexpected payload: {0}")]
    Payload(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VitalSyncError {
    /// Stable label suitable for structured log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Network(_) => "network",
            Self::RateLimited(_) => "rate_limited",
            Self::AuthExpired(_) => "auth_expired",
            Self::AuthExchangeFailed(_) => "auth_exchange_failed",
            Self::CredentialMissing(_) => "credential_missing",
            Self::Server(_) => "server",
            Self::Client(_) => "client",
            Self::RetriesExhausted(_) => "retries_exhausted",
            Self::Storage(_) => "storage",
            Self::Payload(_) => "payload",
            Self::InvalidInput(_) => "invalid_input",
            Self::Cancelled => "cancelled",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for VitalSync operations
pub type Result<T> = std::result::Result<T, VitalSyncError>;
