//! The single retrying request path.
//!
//! Every upstream call, including the token exchange, goes through
//! [`RequestEngine::send`], so all callers get identical failure handling.
//! Waits use the injected [`Sleeper`] and are raced against the process
//! cancellation token.

use std::sync::Arc;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, RETRY_AFTER};
use reqwest::Method;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use vitalsync_core::Sleeper;
use vitalsync_domain::VitalSyncError;

use super::auth::AuthHandler;
use super::errors::ApiError;
use super::retry::{Failure, RetryDecision, RetryPolicy, RetryState};
use crate::http::HttpClient;

/// One logical upstream call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    form: Option<Vec<(String, String)>>,
    token_exchange: bool,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: Method::GET, url: url.into(), query: Vec::new(), form: None, token_exchange: false }
    }

    /// Form-encoded POST to the token endpoint, sent under
    /// [`RetryPolicy::for_token_exchange`].
    pub fn post_form(url: impl Into<String>, form: Vec<(String, String)>) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            query: Vec::new(),
            form: Some(form),
            token_exchange: true,
        }
    }

    pub fn query(mut self, params: &[(&str, String)]) -> Self {
        self.query.extend(params.iter().map(|(k, v)| ((*k).to_string(), v.clone())));
        self
    }
}

/// Retrying HTTP engine shared by the data client and the token manager.
pub struct RequestEngine {
    http: HttpClient,
    policy: RetryPolicy,
    language: String,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancellationToken,
}

impl RequestEngine {
    pub fn new(
        http: HttpClient,
        policy: RetryPolicy,
        language: impl Into<String>,
        sleeper: Arc<dyn Sleeper>,
        cancel: CancellationToken,
    ) -> Self {
        Self { http, policy, language: language.into(), sleeper, cancel }
    }

    /// Send `request`, retrying per policy.
    ///
    /// Returns `Ok(None)` when the call was skipped after exhausting the
    /// server-error budget.
    ///
    /// # Errors
    /// Any non-retryable or exhausted failure, see [`ApiError`].
    pub async fn send(
        &self,
        request: &ApiRequest,
        auth: &dyn AuthHandler,
    ) -> Result<Option<Value>, ApiError> {
        let policy =
            if request.token_exchange { self.policy.for_token_exchange() } else { self.policy.clone() };
        let mut state = RetryState::default();

        loop {
            if self.cancel.is_cancelled() {
                return Err(ApiError::Cancelled);
            }

            let authorization = auth.authorization().await?;
            let failure = match self.attempt(request, &authorization).await? {
                Attempt::Success(body) => return Ok(Some(body)),
                Attempt::Failed(failure) => failure,
            };

            let class = failure.class;
            let status = failure.status;
            match policy.decide(&mut state, failure) {
                RetryDecision::Retry(delay) => {
                    warn!(
                        url = %request.url,
                        %class,
                        ?status,
                        attempts = state.attempts,
                        delay_secs = delay.as_secs(),
                        "upstream call failed, retrying"
                    );
                    self.pause(delay).await?;
                }
                RetryDecision::RefreshAndRetry(delay) => {
                    warn!(url = %request.url, attempts = state.attempts, "access token rejected, refreshing");
                    auth.on_unauthorized(&authorization).await?;
                    self.pause(delay).await?;
                }
                RetryDecision::Skip => {
                    error!(
                        url = %request.url,
                        attempts = state.attempts,
                        "server error retry limit exceeded, skipping request"
                    );
                    return Ok(None);
                }
                RetryDecision::Fail(err) => {
                    error!(url = %request.url, error = %err, "upstream call failed");
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(&self, request: &ApiRequest, authorization: &str) -> Result<Attempt, ApiError> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, "application/json")
            .header(ACCEPT_LANGUAGE, self.language.as_str());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }

        let response = match self.http.send(builder).await {
            Ok(response) => response,
            Err(VitalSyncError::Network(message)) => {
                return Ok(Attempt::Failed(Failure::network(message)));
            }
            Err(other) => return Err(ApiError::from_domain(other)),
        };

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return Ok(Attempt::Failed(Failure::network(err.to_string()))),
        };

        match RetryPolicy::classify(status) {
            None => {
                debug!(url = %request.url, status, bytes = body.len(), "upstream call succeeded");
                parse_body(&body).map(Attempt::Success)
            }
            Some(class) => Ok(Attempt::Failed(
                Failure::status(class, status, truncate(&body)).with_retry_after(retry_after),
            )),
        }
    }

    async fn pause(&self, delay: std::time::Duration) -> Result<(), ApiError> {
        tokio::select! {
            () = self.cancel.cancelled() => Err(ApiError::Cancelled),
            () = self.sleeper.sleep(delay) => Ok(()),
        }
    }
}

impl std::fmt::Debug for RequestEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestEngine")
            .field("policy", &self.policy)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

enum Attempt {
    Success(Value),
    Failed(Failure),
}

fn parse_body(body: &str) -> Result<Value, ApiError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|err| ApiError::Decode(err.to_string()))
}

fn truncate(body: &str) -> String {
    const LIMIT: usize = 512;
    match body.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
