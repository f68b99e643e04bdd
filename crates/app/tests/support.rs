//! Config pointing every endpoint at wiremock servers and every file into a
//! temporary directory.

use tempfile::TempDir;
use vitalsync_domain::Config;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/oauth2/token";

pub struct TestEnv {
    pub api: MockServer,
    pub dir: TempDir,
    pub config: Config,
}

impl TestEnv {
    pub async fn new() -> Self {
        let api = MockServer::start().await;
        let dir = tempfile::tempdir().expect("temp dir should be created");

        let mut config = Config::default();
        config.api.base_url = api.uri();
        config.api.token_url = format!("{}{TOKEN_PATH}", api.uri());
        config.api.client_id = "23ABCD".into();
        config.api.client_secret = "s3cret".into();
        config.storage.token_file = dir.path().join("tokens.json").to_string_lossy().into_owned();
        config.storage.log_file = dir.path().join("vitalsync.log").to_string_lossy().into_owned();
        config.sink.url = format!("{}/write", api.uri());
        config.device.name = "Charge6".into();

        Self { api, dir, config }
    }

    pub fn token_file_contents(&self) -> Option<serde_json::Value> {
        let raw = std::fs::read_to_string(&self.config.storage.token_file).ok()?;
        serde_json::from_str(&raw).ok()
    }

    pub async fn mount_token_endpoint(&self, expected_refresh: &str, access: &str, refresh: &str) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(wiremock::matchers::body_string_contains(format!("refresh_token={expected_refresh}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": access,
                "refresh_token": refresh,
            })))
            .expect(1)
            .mount(&self.api)
            .await;
    }
}
