//! Multi-cadence collector scheduler.
//!
//! Runs the fetch job catalog, the proactive token refresh and the buffer
//! flush from a single background task. Tasks never overlap: each due task
//! runs to completion before the next one starts, and the loop sleeps until
//! the earliest next due time or cancellation.
//!
//! A failing task is logged and the loop continues. Stopping the scheduler
//! interrupts the task in flight and performs one last flush so points
//! already collected are not lost.
//!
//! # Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use vitalsync_core::{fetch::default_catalog, PointBuffer, SystemClock};
//! # use vitalsync_domain::Config;
//! use vitalsync_infra::scheduling::{CollectorScheduler, CollectorSchedulerConfig};
//!
//! # async fn example(
//! #     api: Arc<dyn vitalsync_core::ApiRequester>,
//! #     refresher: Arc<dyn vitalsync_infra::scheduling::CredentialRefresher>,
//! #     sink: Arc<dyn vitalsync_core::MetricsSink>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let mut scheduler = CollectorScheduler::new(
//!     default_catalog(&config.schedule),
//!     api,
//!     refresher,
//!     sink,
//!     PointBuffer::new(),
//!     Arc::new(SystemClock),
//!     CollectorSchedulerConfig::from_config(&config)?,
//! );
//!
//! scheduler.start().await?;
//! // ... until shutdown ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use vitalsync_core::sink::drain_into;
use vitalsync_core::{
    ApiRequester, CadenceBook, Clock, FetchContext, FetchJobSpec, MetricsSink, PointBuffer, TaskId,
};
use vitalsync_domain::{Config, DateWindow, VitalSyncError};

use crate::auth::TokenManager;
use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Something that can renew the upstream credential on demand.
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    async fn refresh_credential(&self) -> Result<(), VitalSyncError>;
}

#[async_trait]
impl CredentialRefresher for TokenManager {
    async fn refresh_credential(&self) -> Result<(), VitalSyncError> {
        self.refresh().await.map(|_| ()).map_err(VitalSyncError::from)
    }
}

/// Configuration for the collector scheduler
#[derive(Debug, Clone)]
pub struct CollectorSchedulerConfig {
    /// API root handed to every fetch job.
    pub api_base: String,
    /// `Device` tag value.
    pub device: String,
    pub timezone: Tz,
    /// Days before today covered by range fetches.
    pub lookback_days: u32,
    pub flush_interval: Duration,
    pub token_refresh_interval: Duration,
    /// Fire fetch jobs and the flush once at start instead of after a full
    /// interval. The token refresh always waits one interval.
    pub run_on_start: bool,
    /// How long `stop` waits for the loop (including its final flush).
    pub join_timeout: Duration,
}

impl CollectorSchedulerConfig {
    /// # Errors
    /// `CreationFailed` if the device timezone is not a known IANA zone.
    pub fn from_config(config: &Config) -> SchedulerResult<Self> {
        let timezone: Tz = config.device.timezone.parse().map_err(|_| {
            SchedulerError::CreationFailed(format!("unknown timezone '{}'", config.device.timezone))
        })?;

        Ok(Self {
            api_base: config.api.base_url.clone(),
            device: config.device.name.clone(),
            timezone,
            lookback_days: config.schedule.lookback_days,
            flush_interval: Duration::from_secs(config.schedule.flush_interval_secs),
            token_refresh_interval: Duration::from_secs(config.schedule.token_refresh_interval_secs),
            run_on_start: config.schedule.run_on_start,
            join_timeout: Duration::from_secs(config.sink.timeout_secs + 15),
        })
    }
}

/// Context for the collector loop to avoid too many arguments (clippy)
struct CollectorLoopContext {
    jobs: Vec<FetchJobSpec>,
    api: Arc<dyn ApiRequester>,
    refresher: Arc<dyn CredentialRefresher>,
    sink: Arc<dyn MetricsSink>,
    buffer: PointBuffer,
    clock: Arc<dyn Clock>,
    config: CollectorSchedulerConfig,
}

/// Collector scheduler driving fetch, refresh and flush cadences
pub struct CollectorScheduler {
    jobs: Vec<FetchJobSpec>,
    api: Arc<dyn ApiRequester>,
    refresher: Arc<dyn CredentialRefresher>,
    sink: Arc<dyn MetricsSink>,
    buffer: PointBuffer,
    clock: Arc<dyn Clock>,
    config: CollectorSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl CollectorScheduler {
    pub fn new(
        jobs: Vec<FetchJobSpec>,
        api: Arc<dyn ApiRequester>,
        refresher: Arc<dyn CredentialRefresher>,
        sink: Arc<dyn MetricsSink>,
        buffer: PointBuffer,
        clock: Arc<dyn Clock>,
        config: CollectorSchedulerConfig,
    ) -> Self {
        Self {
            jobs,
            api,
            refresher,
            sink,
            buffer,
            clock,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn buffer(&self) -> &PointBuffer {
        &self.buffer
    }

    pub fn jobs(&self) -> &[FetchJobSpec] {
        &self.jobs
    }

    /// Start the scheduler
    ///
    /// Spawns the background loop. A stopped scheduler can be started again.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(jobs = self.jobs.len(), "Starting collector scheduler");

        // Create a new cancellation token (supports restart after stop)
        self.cancellation_token = CancellationToken::new();

        let context = self.loop_context();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            context.run(cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!("Collector scheduler started");
        Ok(())
    }

    /// Stop the scheduler gracefully
    ///
    /// Cancels the loop and awaits its final flush.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is not running or the loop does not finish
    /// within the join timeout
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping collector scheduler");
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })??;
        }

        info!("Collector scheduler stopped");
        Ok(())
    }

    /// Run the loop on the current task until `cancel` fires, then flush.
    ///
    /// Foreground alternative to [`start`](Self::start) for a binary whose
    /// only job is collecting.
    pub async fn run_until_cancelled(&self, cancel: CancellationToken) {
        self.loop_context().run(cancel).await;
    }

    fn loop_context(&self) -> CollectorLoopContext {
        CollectorLoopContext {
            jobs: self.jobs.clone(),
            api: Arc::clone(&self.api),
            refresher: Arc::clone(&self.refresher),
            sink: Arc::clone(&self.sink),
            buffer: self.buffer.clone(),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
        }
    }

    /// Check if scheduler is running
    ///
    /// A scheduler is considered running if it has an active task handle that
    /// hasn't finished.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for CollectorScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorScheduler")
            .field("jobs", &self.jobs)
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Tokio's clock, so paused-time tests drive the cadence book.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

impl CollectorLoopContext {
    fn cadence_book(&self, start: Instant) -> CadenceBook {
        let mut book = CadenceBook::new();
        let run_on_start = self.config.run_on_start;

        book.register(TaskId::TokenRefresh, self.config.token_refresh_interval, start, false);
        book.register(TaskId::Flush, self.config.flush_interval, start, run_on_start);
        for (index, spec) in self.jobs.iter().enumerate() {
            book.register(TaskId::Fetch(index), spec.interval, start, run_on_start);
        }
        book
    }

    async fn run(self, cancel: CancellationToken) {
        let mut book = self.cadence_book(now());
        info!(tasks = book.len(), "collector loop running");

        'ticks: loop {
            for id in book.due(now()) {
                tokio::select! {
                    () = cancel.cancelled() => break 'ticks,
                    () = self.run_task(id) => {}
                }
                book.mark_ran(id, now());
            }

            let wait = book.time_until_next(now()).unwrap_or(self.config.flush_interval);
            debug!(wait_secs = wait.as_secs(), "collector loop idle");
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(wait) => {}
            }
        }

        debug!("collector loop cancelled, flushing remaining points");
        drain_into(&self.buffer, self.sink.as_ref()).await;
        info!("collector loop exited");
    }

    async fn run_task(&self, id: TaskId) {
        match id {
            TaskId::TokenRefresh => {
                if let Err(err) = self.refresher.refresh_credential().await {
                    error!(error = %err, "scheduled token refresh failed");
                }
            }
            TaskId::Flush => {
                drain_into(&self.buffer, self.sink.as_ref()).await;
            }
            TaskId::Fetch(index) => match self.jobs.get(index) {
                Some(spec) => self.run_fetch(spec).await,
                None => warn!(task = %id, "no fetch job registered at this index"),
            },
        }
    }

    async fn run_fetch(&self, spec: &FetchJobSpec) {
        let ctx = self.fetch_context();
        let started = Instant::now();

        match spec.job.fetch(&ctx, self.api.as_ref(), &self.buffer).await {
            Ok(points) => info!(
                job = %spec.name,
                points,
                elapsed_ms = started.elapsed().as_millis(),
                "fetch job completed"
            ),
            Err(VitalSyncError::Cancelled) => debug!(job = %spec.name, "fetch job cancelled"),
            Err(err) => error!(
                job = %spec.name,
                kind = err.label(),
                error = %err,
                "fetch job failed, will retry on next tick"
            ),
        }
    }

    /// Rebuilt per dispatch so the window follows the local date.
    fn fetch_context(&self) -> FetchContext {
        let today = self.clock.today_in(self.config.timezone);
        FetchContext {
            api_base: self.config.api_base.clone(),
            device: self.config.device.clone(),
            timezone: self.config.timezone,
            window: DateWindow::ending_on(today, self.config.lookback_days),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{NaiveDate, TimeZone, Utc};
    use vitalsync_core::testing::{FixedClock, RecordingSink, StaticApi};
    use vitalsync_core::FetchJob;
    use vitalsync_domain::{Point, Result};

    use super::*;

    /// Appends one point per run and remembers each window end it saw.
    #[derive(Default)]
    struct ProbeJob {
        runs: AtomicUsize,
        window_ends: std::sync::Mutex<Vec<NaiveDate>>,
        fail: bool,
    }

    impl ProbeJob {
        fn failing() -> Self {
            Self { fail: true, ..Self::default() }
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }

        fn window_ends(&self) -> Vec<NaiveDate> {
            self.window_ends.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FetchJob for ProbeJob {
        fn name(&self) -> &str {
            "probe"
        }

        async fn fetch(
            &self,
            ctx: &FetchContext,
            _api: &dyn ApiRequester,
            out: &PointBuffer,
        ) -> Result<usize> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.window_ends.lock().unwrap().push(ctx.window.end());
            if self.fail {
                return Err(VitalSyncError::Server("upstream down".into()));
            }
            let point = Point::builder("Probe", Utc::now())
                .device(ctx.device.clone())
                .field("value", 1_i64)
                .build()?;
            out.push(point);
            Ok(1)
        }
    }

    #[derive(Default)]
    struct CountingRefresher(AtomicUsize);

    #[async_trait]
    impl CredentialRefresher for CountingRefresher {
        async fn refresh_credential(&self) -> std::result::Result<(), VitalSyncError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Harness {
        scheduler: CollectorScheduler,
        job: Arc<ProbeJob>,
        refresher: Arc<CountingRefresher>,
        sink: RecordingSink,
        clock: FixedClock,
    }

    fn harness(job: ProbeJob, job_interval: u64, config: CollectorSchedulerConfig) -> Harness {
        let job = Arc::new(job);
        let refresher = Arc::new(CountingRefresher::default());
        let sink = RecordingSink::accepting();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        let scheduler = CollectorScheduler::new(
            vec![FetchJobSpec::new(Duration::from_secs(job_interval), job.clone())],
            Arc::new(StaticApi::new()),
            refresher.clone(),
            Arc::new(sink.clone()),
            PointBuffer::new(),
            Arc::new(clock.clone()),
            config,
        );
        Harness { scheduler, job, refresher, sink, clock }
    }

    fn config() -> CollectorSchedulerConfig {
        CollectorSchedulerConfig {
            api_base: "https://api.test".into(),
            device: "Charge6".into(),
            timezone: Tz::UTC,
            lookback_days: 0,
            flush_interval: Duration::from_secs(30),
            token_refresh_interval: Duration::from_secs(100),
            run_on_start: true,
            join_timeout: Duration::from_secs(5),
        }
    }

    async fn advance(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_stop_lifecycle() {
        let mut h = harness(ProbeJob::default(), 60, config());

        h.scheduler.start().await.unwrap();
        assert!(h.scheduler.is_running());
        assert!(matches!(h.scheduler.start().await, Err(SchedulerError::AlreadyRunning)));

        h.scheduler.stop().await.unwrap();
        assert!(!h.scheduler.is_running());
        assert!(matches!(h.scheduler.stop().await, Err(SchedulerError::NotRunning)));

        h.scheduler.start().await.unwrap();
        h.scheduler.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn run_on_start_fetches_and_flushes_in_first_tick() {
        let mut h = harness(ProbeJob::default(), 60, config());

        h.scheduler.start().await.unwrap();
        advance(1).await;

        assert_eq!(h.job.runs(), 1);
        assert_eq!(h.sink.written().len(), 1);
        assert_eq!(h.sink.written()[0].device(), Some("Charge6"));
        h.scheduler.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_follow_their_own_cadence() {
        let mut h = harness(ProbeJob::default(), 60, config());

        h.scheduler.start().await.unwrap();
        advance(150).await;

        // fetch at 0, 60, 120; token refresh waits a full interval (100)
        assert_eq!(h.job.runs(), 3);
        assert_eq!(h.refresher.0.load(Ordering::SeqCst), 1);
        h.scheduler.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failing_job_does_not_stop_the_loop() {
        let mut h = harness(ProbeJob::failing(), 60, config());

        h.scheduler.start().await.unwrap();
        advance(130).await;

        assert_eq!(h.job.runs(), 3);
        assert!(h.scheduler.is_running());
        assert_eq!(h.sink.calls(), 0);
        h.scheduler.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_flushes_pending_points() {
        let config = CollectorSchedulerConfig {
            run_on_start: false,
            flush_interval: Duration::from_secs(3600),
            ..config()
        };
        let mut h = harness(ProbeJob::default(), 10, config);

        h.scheduler.start().await.unwrap();
        advance(15).await;
        assert_eq!(h.sink.calls(), 0);
        assert_eq!(h.scheduler.buffer().len(), 1);

        h.scheduler.stop().await.unwrap();
        assert_eq!(h.sink.written().len(), 1);
        assert!(h.scheduler.buffer().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn window_follows_the_local_date() {
        let mut h = harness(ProbeJob::default(), 60, config());

        h.scheduler.start().await.unwrap();
        advance(1).await;
        h.clock.set(Utc.with_ymd_and_hms(2024, 1, 2, 0, 5, 0).unwrap());
        advance(60).await;

        assert_eq!(
            h.job.window_ends(),
            vec![NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()]
        );
        h.scheduler.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn foreground_run_returns_after_cancel_with_final_flush() {
        let config = CollectorSchedulerConfig { flush_interval: Duration::from_secs(3600), ..config() };
        let h = harness(ProbeJob::default(), 10, config);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            advance(25).await;
            trigger.cancel();
        });
        h.scheduler.run_until_cancelled(cancel).await;

        // fetch at 0, 10, 20; one point flushed at 0, the other two on exit
        assert_eq!(h.job.runs(), 3);
        assert_eq!(h.sink.written().len(), 3);
    }

    #[test]
    fn config_rejects_unknown_zone() {
        let mut config = Config::default();
        config.device.timezone = "Mars/Olympus".into();
        assert!(matches!(
            CollectorSchedulerConfig::from_config(&config),
            Err(SchedulerError::CreationFailed(_))
        ));
    }
}
