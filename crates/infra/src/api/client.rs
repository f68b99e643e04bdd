//! Authenticated data client for fetch jobs.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;
use vitalsync_core::ApiRequester;
use vitalsync_domain::Result;

use super::engine::{ApiRequest, RequestEngine};
use crate::auth::TokenManager;

/// Bearer-authenticated GETs through the retrying engine.
///
/// A `401` hands the rejected token back to the [`TokenManager`], which
/// refreshes at most once per expiry.
#[derive(Debug, Clone)]
pub struct ResilientClient {
    engine: Arc<RequestEngine>,
    tokens: Arc<TokenManager>,
}

impl ResilientClient {
    pub fn new(engine: Arc<RequestEngine>, tokens: Arc<TokenManager>) -> Self {
        Self { engine, tokens }
    }
}

#[async_trait]
impl ApiRequester for ResilientClient {
    #[instrument(skip(self, params), fields(url = %url))]
    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> Result<Option<Value>> {
        let request = ApiRequest::get(url).query(params);
        self.engine.send(&request, self.tokens.as_ref()).await.map_err(Into::into)
    }
}
