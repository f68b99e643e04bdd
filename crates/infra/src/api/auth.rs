//! Authorization for upstream calls
//!
//! The engine asks an [`AuthHandler`] for the `Authorization` header before
//! every attempt and tells it when that header was rejected. Data calls use
//! the bearer token owned by the token manager; the token exchange itself
//! uses HTTP Basic client credentials, which cannot be refreshed.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::errors::ApiError;

/// Supplies and repairs the `Authorization` header.
#[async_trait]
pub trait AuthHandler: Send + Sync {
    /// Header value for the next attempt.
    async fn authorization(&self) -> Result<String, ApiError>;

    /// Called on `401` with the header value that was rejected.
    ///
    /// Returning `Ok` lets the engine retry; an error ends the call.
    async fn on_unauthorized(&self, rejected: &str) -> Result<(), ApiError>;
}

/// HTTP Basic credentials for the OAuth client.
#[derive(Clone)]
pub struct BasicAuth {
    header: String,
}

impl BasicAuth {
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        let encoded = STANDARD.encode(format!("{client_id}:{client_secret}"));
        Self { header: format!("Basic {encoded}") }
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BasicAuth(<redacted>)")
    }
}

#[async_trait]
impl AuthHandler for BasicAuth {
    async fn authorization(&self) -> Result<String, ApiError> {
        Ok(self.header.clone())
    }

    async fn on_unauthorized(&self, _rejected: &str) -> Result<(), ApiError> {
        Err(ApiError::AuthExchangeFailed(
            "client credentials or refresh token rejected by the token endpoint".into(),
        ))
    }
}
