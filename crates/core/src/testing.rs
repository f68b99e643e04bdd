//! Deterministic test doubles for the core ports.
//!
//! Compiled for this crate's tests and, through the `test-utils` feature,
//! for downstream integration tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use vitalsync_domain::{Credential, DateWindow, Point, Result, VitalSyncError};

use crate::auth::ports::CredentialStore;
use crate::fetch::ports::{ApiRequester, FetchContext};
use crate::sink::ports::{FlushOutcome, MetricsSink};
use crate::time::{Clock, Sleeper};

/// Base URL used by [`context`].
pub const TEST_API_BASE: &str = "https://api.test";

/// Fetch context for device `Charge6` on 2024-01-01 in zone `tz`.
///
/// # Panics
/// Panics if `tz` is not a valid IANA zone name.
pub fn context(tz: &str) -> FetchContext {
    FetchContext {
        api_base: TEST_API_BASE.to_string(),
        device: "Charge6".to_string(),
        timezone: tz.parse().unwrap_or_else(|_| panic!("unknown zone {tz}")),
        window: DateWindow::single_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()),
    }
}

/// Records every requested sleep and returns immediately.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    pub fn total(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        tokio::task::yield_now().await;
    }
}

/// Clock pinned to a settable instant.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(now)) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// In-memory credential store that counts saves.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    credential: Arc<Mutex<Option<Credential>>>,
    saves: Arc<Mutex<usize>>,
    fail_saves: bool,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        let store = Self::default();
        *store.credential.lock() = Some(credential);
        store
    }

    /// A store whose `save` always fails.
    pub fn failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    pub fn stored(&self) -> Option<Credential> {
        self.credential.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Credential>> {
        Ok(self.credential.lock().clone())
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        if self.fail_saves {
            return Err(VitalSyncError::Storage("credential store is read-only".into()));
        }
        *self.credential.lock() = Some(credential.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Canned {
    Body(Value),
    Skipped,
    Fail(VitalSyncError),
}

/// Upstream API answering from canned responses keyed by path (the URL with
/// [`TEST_API_BASE`] stripped). Unknown paths behave like a skipped request.
#[derive(Debug, Clone, Default)]
pub struct StaticApi {
    responses: HashMap<String, Canned>,
    requests: Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>,
}

impl StaticApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, body: Value) -> Self {
        self.responses.insert(path.to_string(), Canned::Body(body));
        self
    }

    pub fn skipping(mut self, path: &str) -> Self {
        self.responses.insert(path.to_string(), Canned::Skipped);
        self
    }

    pub fn failing(mut self, path: &str, error: VitalSyncError) -> Self {
        self.responses.insert(path.to_string(), Canned::Fail(error));
        self
    }

    /// Paths requested so far, in order.
    pub fn requested_paths(&self) -> Vec<String> {
        self.requests.lock().iter().map(|(path, _)| path.clone()).collect()
    }

    /// Query parameters of the first request to `path`.
    pub fn requested_params(&self, path: &str) -> Vec<(String, String)> {
        self.requests
            .lock()
            .iter()
            .find(|(requested, _)| requested == path)
            .map(|(_, params)| params.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ApiRequester for StaticApi {
    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> Result<Option<Value>> {
        let path = url.strip_prefix(TEST_API_BASE).unwrap_or(url).to_string();
        let owned = params.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect();
        self.requests.lock().push((path.clone(), owned));

        match self.responses.get(&path) {
            Some(Canned::Body(body)) => Ok(Some(body.clone())),
            Some(Canned::Fail(error)) => Err(error.clone()),
            Some(Canned::Skipped) | None => Ok(None),
        }
    }
}

/// Sink that records batches and answers with a fixed outcome.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    failure: Option<String>,
    calls: Arc<Mutex<usize>>,
    written: Arc<Mutex<Vec<Point>>>,
}

impl RecordingSink {
    pub fn accepting() -> Self {
        Self::default()
    }

    pub fn failing(reason: &str) -> Self {
        Self { failure: Some(reason.to_string()), ..Self::default() }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }

    /// Points of every accepted batch.
    pub fn written(&self) -> Vec<Point> {
        self.written.lock().clone()
    }
}

#[async_trait]
impl MetricsSink for RecordingSink {
    async fn flush(&self, points: Vec<Point>) -> FlushOutcome {
        if points.is_empty() {
            return FlushOutcome::Skipped;
        }
        *self.calls.lock() += 1;
        let count = points.len();
        match &self.failure {
            Some(reason) => FlushOutcome::Dropped { count, reason: reason.clone() },
            None => {
                self.written.lock().extend(points);
                FlushOutcome::Written { count }
            }
        }
    }
}
