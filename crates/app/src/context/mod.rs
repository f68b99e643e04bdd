//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vitalsync_core::fetch::default_catalog;
use vitalsync_core::{CredentialStore, PointBuffer, SystemClock, TokioSleeper};
use vitalsync_domain::{Config, Result, VitalSyncError};
use vitalsync_infra::{
    ApiError, CollectorScheduler, CollectorSchedulerConfig, FileCredentialStore, HttpClient,
    LineProtocolSink, RequestEngine, ResilientClient, RetryPolicy, TokenManager,
};

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    /// Root token: cancels backoff waits and the collector loop.
    pub cancel: CancellationToken,
    pub tokens: Arc<TokenManager>,
    pub client: Arc<ResilientClient>,
    pub buffer: PointBuffer,
    pub scheduler: CollectorScheduler,
}

impl AppContext {
    /// Wire every component from `config`. Nothing touches the network yet.
    ///
    /// # Errors
    /// Returns `VitalSyncError::Config` if an HTTP client cannot be built or
    /// the time zone is unknown.
    pub fn new(config: Config) -> Result<Self> {
        let cancel = CancellationToken::new();

        let api_http = HttpClient::builder()
            .timeout(Duration::from_secs(config.api.request_timeout_secs))
            .build()?;
        let engine = Arc::new(RequestEngine::new(
            api_http,
            RetryPolicy::from_config(&config.retry),
            config.api.language.clone(),
            Arc::new(TokioSleeper),
            cancel.clone(),
        ));

        let store: Arc<dyn CredentialStore> =
            Arc::new(FileCredentialStore::new(&config.storage.token_file));
        let tokens = Arc::new(TokenManager::new(
            Arc::clone(&engine),
            store,
            config.api.token_url.clone(),
            &config.api.client_id,
            &config.api.client_secret,
        ));
        let client = Arc::new(ResilientClient::new(engine, Arc::clone(&tokens)));
        let sink = Arc::new(LineProtocolSink::from_config(&config.sink)?);

        let buffer = PointBuffer::new();
        let scheduler = CollectorScheduler::new(
            default_catalog(&config.schedule),
            client.clone(),
            tokens.clone(),
            sink,
            buffer.clone(),
            Arc::new(SystemClock),
            CollectorSchedulerConfig::from_config(&config)?,
        );

        Ok(Self { config, cancel, tokens, client, buffer, scheduler })
    }

    /// Make sure a usable credential is loaded before polling starts.
    ///
    /// A stored credential is refreshed once so polling begins with a fresh
    /// access token. Without one, the refresh token comes from
    /// `initial_refresh_token` or, failing that, from `prompt`.
    ///
    /// # Errors
    /// Any exchange or storage failure, or an empty supplied token.
    pub async fn ensure_credential<F>(&self, prompt: F) -> Result<()>
    where
        F: FnOnce() -> std::io::Result<String>,
    {
        match self.tokens.initialize().await {
            Ok(()) => {
                self.tokens.refresh().await?;
                info!("stored credential refreshed");
                Ok(())
            }
            Err(ApiError::CredentialMissing(_)) => {
                let refresh_token = match self.config.initial_refresh_token.as_deref() {
                    Some(token) if !token.trim().is_empty() => token.to_string(),
                    _ => {
                        warn!("no stored credential and no configured refresh token, prompting");
                        prompt().map_err(|err| VitalSyncError::CredentialMissing(err.to_string()))?
                    }
                };
                self.tokens.bootstrap(&refresh_token).await?;
                info!("credential bootstrapped from supplied refresh token");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Poll until the root token is cancelled, then flush once more.
    pub async fn run(&self) {
        info!(
            device = %self.config.device.name,
            timezone = %self.config.device.timezone,
            jobs = self.scheduler.jobs().len(),
            "collector starting"
        );
        self.scheduler.run_until_cancelled(self.cancel.clone()).await;
        info!("collector stopped");
    }
}
