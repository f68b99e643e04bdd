//! Token manager with refresh-grant exchange
//!
//! Owns the in-memory credential pair:
//! - Loads it from the credential store at start-up
//! - Exchanges the refresh token for a new pair (form POST, Basic auth)
//! - Persists every new pair before readers can observe it as settled
//! - Serialises refreshes so concurrent 401s trigger a single exchange

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument};
use vitalsync_core::CredentialStore;
use vitalsync_domain::Credential;

use crate::api::auth::{AuthHandler, BasicAuth};
use crate::api::engine::{ApiRequest, RequestEngine};
use crate::api::errors::ApiError;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

/// Single owner of the OAuth credential.
pub struct TokenManager {
    engine: Arc<RequestEngine>,
    store: Arc<dyn CredentialStore>,
    token_url: String,
    client_auth: BasicAuth,
    current: RwLock<Option<Credential>>,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    #[must_use]
    pub fn new(
        engine: Arc<RequestEngine>,
        store: Arc<dyn CredentialStore>,
        token_url: impl Into<String>,
        client_id: &str,
        client_secret: &str,
    ) -> Self {
        Self {
            engine,
            store,
            token_url: token_url.into(),
            client_auth: BasicAuth::new(client_id, client_secret),
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Load the persisted credential into memory.
    ///
    /// # Errors
    /// `CredentialMissing` when nothing is stored yet; the caller must then
    /// [`bootstrap`](Self::bootstrap) with an externally supplied refresh
    /// token.
    pub async fn initialize(&self) -> Result<(), ApiError> {
        match self.store.load().await.map_err(ApiError::from_domain)? {
            Some(credential) => {
                *self.current.write().await = Some(credential);
                info!("token manager initialized with stored credential");
                Ok(())
            }
            None => {
                debug!("no stored credential found");
                Err(ApiError::CredentialMissing(
                    "no stored credential; a refresh token must be supplied".into(),
                ))
            }
        }
    }

    /// Seed the manager with an operator-supplied refresh token and exchange
    /// it immediately.
    ///
    /// # Errors
    /// Any failure of the exchange or of persisting the result.
    pub async fn bootstrap(&self, refresh_token: &str) -> Result<Credential, ApiError> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(ApiError::CredentialMissing("supplied refresh token is empty".into()));
        }

        let _guard = self.refresh_lock.lock().await;
        *self.current.write().await = Some(Credential::from_refresh_token(refresh_token));
        info!("bootstrapping credential from supplied refresh token");
        self.refresh_locked().await
    }

    /// Current access token; empty when no credential is loaded.
    pub async fn current_access_token(&self) -> String {
        self.current.read().await.as_ref().map(|c| c.access_token.clone()).unwrap_or_default()
    }

    /// Snapshot of the in-memory credential.
    pub async fn credential(&self) -> Option<Credential> {
        self.current.read().await.clone()
    }

    /// Exchange the current refresh token for a new pair.
    ///
    /// # Errors
    /// `CredentialMissing` without a loaded credential, `AuthExchangeFailed`
    /// when the token endpoint answers 401, `Storage` when the new pair was
    /// obtained but could not be persisted, or any engine failure.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Credential, ApiError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh only if `rejected` is still the current access token.
    ///
    /// Callers that hit the same expiry while another refresh was in flight
    /// find a newer token and return without a second exchange.
    ///
    /// # Errors
    /// See [`refresh`](Self::refresh).
    pub async fn refresh_if_stale(&self, rejected: &str) -> Result<(), ApiError> {
        let _guard = self.refresh_lock.lock().await;
        if self.current_access_token().await != rejected {
            debug!("access token already refreshed by another caller");
            return Ok(());
        }
        self.refresh_locked().await.map(|_| ())
    }

    /// Caller must hold `refresh_lock`.
    async fn refresh_locked(&self) -> Result<Credential, ApiError> {
        let refresh_token = self
            .current
            .read()
            .await
            .as_ref()
            .map(|c| c.refresh_token.clone())
            .ok_or_else(|| ApiError::CredentialMissing("no refresh token loaded".into()))?;

        info!("refreshing access token");
        let request = ApiRequest::post_form(
            self.token_url.as_str(),
            vec![
                ("grant_type".to_string(), "refresh_token".to_string()),
                ("refresh_token".to_string(), refresh_token),
            ],
        );
        let body = self.engine.send(&request, &self.client_auth).await?.ok_or_else(|| {
            ApiError::AuthExchangeFailed("token endpoint returned no body".into())
        })?;
        let tokens: TokenResponse = serde_json::from_value(body)
            .map_err(|err| ApiError::Decode(format!("token response: {err}")))?;

        let credential = Credential::new(tokens.access_token, tokens.refresh_token);
        *self.current.write().await = Some(credential.clone());

        if let Err(err) = self.store.save(&credential).await {
            error!(error = %err, "refreshed credential could not be persisted");
            return Err(ApiError::from_domain(err));
        }

        info!("access token refreshed");
        Ok(credential)
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager").field("token_url", &self.token_url).finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthHandler for TokenManager {
    async fn authorization(&self) -> Result<String, ApiError> {
        Ok(format!("Bearer {}", self.current_access_token().await))
    }

    async fn on_unauthorized(&self, rejected: &str) -> Result<(), ApiError> {
        let rejected = rejected.strip_prefix("Bearer ").unwrap_or(rejected);
        self.refresh_if_stale(rejected).await
    }
}
