//! Shared wiring for infra integration tests: a real request engine, token
//! manager and resilient client pointed at a wiremock server, with sleeps
//! recorded instead of waited.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vitalsync_core::testing::{MemoryCredentialStore, RecordingSleeper};
use vitalsync_domain::Credential;
use vitalsync_infra::{HttpClient, RequestEngine, ResilientClient, RetryPolicy, TokenManager};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/oauth2/token";
pub const DEVICES_PATH: &str = "/1/user/-/devices.json";

pub struct ApiHarness {
    pub server: MockServer,
    pub sleeper: RecordingSleeper,
    pub store: Arc<MemoryCredentialStore>,
    pub engine: Arc<RequestEngine>,
    pub tokens: Arc<TokenManager>,
    pub client: ResilientClient,
    pub cancel: CancellationToken,
}

impl ApiHarness {
    /// Default policy, store seeded with `at-0` / `rt-0`.
    pub async fn start() -> Self {
        Self::build(RetryPolicy::default(), MemoryCredentialStore::with_credential(seed())).await
    }

    pub async fn with_policy(policy: RetryPolicy) -> Self {
        Self::build(policy, MemoryCredentialStore::with_credential(seed())).await
    }

    /// Harness around `store` without calling `initialize`.
    pub async fn with_store(store: MemoryCredentialStore) -> Self {
        Self::wire(RetryPolicy::default(), store).await
    }

    async fn build(policy: RetryPolicy, store: MemoryCredentialStore) -> Self {
        let harness = Self::wire(policy, store).await;
        harness.tokens.initialize().await.expect("seeded store should initialize");
        harness
    }

    async fn wire(policy: RetryPolicy, store: MemoryCredentialStore) -> Self {
        let server = MockServer::start().await;
        let sleeper = RecordingSleeper::new();
        let cancel = CancellationToken::new();
        let store = Arc::new(store);

        let http = HttpClient::new().expect("http client should build");
        let engine = Arc::new(RequestEngine::new(
            http,
            policy,
            "en_US",
            Arc::new(sleeper.clone()),
            cancel.clone(),
        ));
        let tokens = Arc::new(TokenManager::new(
            Arc::clone(&engine),
            store.clone(),
            format!("{}{TOKEN_PATH}", server.uri()),
            "23ABCD",
            "s3cret",
        ));
        let client = ResilientClient::new(Arc::clone(&engine), Arc::clone(&tokens));

        Self { server, sleeper, store, engine, tokens, client, cancel }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.server.uri())
    }

    /// Token endpoint answering every exchange with `access` / `refresh`.
    pub async fn mount_token_endpoint(&self, access: &str, refresh: &str, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": access,
                "refresh_token": refresh,
                "token_type": "Bearer",
                "expires_in": 28800,
            })))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }
}

pub fn seed() -> Credential {
    Credential::new("at-0", "rt-0")
}

/// One paired device as the devices endpoint returns it.
pub fn devices_body() -> serde_json::Value {
    serde_json::json!([{
        "batteryLevel": 88,
        "deviceVersion": "Charge 6",
        "lastSyncTime": "2024-01-01T07:15:30.000",
    }])
}
