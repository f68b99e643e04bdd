//! Configuration structures
//!
//! Every section is fully defaulted so partial config files and an empty
//! environment both produce a runnable configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{
    ACTIVITY_MINUTES_INTERVAL_SECS, AUTH_RETRY_DELAY_SECS, BATTERY_INTERVAL_SECS,
    DEFAULT_API_BASE_URL, DEFAULT_DEVICE_NAME, DEFAULT_LANGUAGE, DEFAULT_LOG_FILE,
    DEFAULT_LOOKBACK_DAYS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_AFTER_SECS,
    DEFAULT_SINK_TIMEOUT_SECS, DEFAULT_SINK_URL, DEFAULT_TIMEZONE, DEFAULT_TOKEN_FILE,
    DEFAULT_TOKEN_URL, EXPIRED_TOKEN_MAX_RETRY, FLUSH_INTERVAL_SECS, HRV_INTERVAL_SECS,
    INTRADAY_TODAY_INTERVAL_SECS, INTRADAY_YESTERDAY_INTERVAL_SECS, NETWORK_ERROR_DELAY_SECS,
    RATE_LIMIT_PADDING_SECS, RECENT_ACTIVITIES_INTERVAL_SECS, SERVER_ERROR_DELAY_SECS,
    SERVER_ERROR_MAX_RETRY, SLEEP_INTERVAL_SECS, SPO2_INTERVAL_SECS, TOKEN_REFRESH_INTERVAL_SECS,
};
use crate::types::DetailLevel;

/// Root configuration for the collector process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub device: DeviceConfig,
    pub storage: StorageConfig,
    pub sink: SinkConfig,
    pub retry: RetryConfig,
    pub schedule: ScheduleConfig,
    /// Refresh token used only when no credential file exists yet.
    pub initial_refresh_token: Option<String>,
}

/// Upstream OAuth API settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub language: String,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("language", &self.language)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// The single polled device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Value of the `Device` tag on emitted points.
    pub name: String,
    /// IANA zone used to interpret the API's local timestamps.
    pub timezone: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self { name: DEFAULT_DEVICE_NAME.to_string(), timezone: DEFAULT_TIMEZONE.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub token_file: String,
    pub log_file: String,
    /// Truncate the log file at start-up.
    pub overwrite_log_file: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            token_file: DEFAULT_TOKEN_FILE.to_string(),
            log_file: DEFAULT_LOG_FILE.to_string(),
            overwrite_log_file: true,
        }
    }
}

/// Line-protocol import endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self { url: DEFAULT_SINK_URL.to_string(), timeout_secs: DEFAULT_SINK_TIMEOUT_SECS }
    }
}

/// Per-failure-class retry settings for upstream calls.
///
/// `network_error_max_retry` and `rate_limit_max_retry` default to `None`,
/// meaning those classes retry until cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub expired_token_max_retry: u32,
    pub server_error_max_retry: u32,
    pub skip_on_server_error: bool,
    pub network_error_max_retry: Option<u32>,
    pub rate_limit_max_retry: Option<u32>,
    pub rate_limit_padding_secs: u64,
    pub default_retry_after_secs: u64,
    pub auth_retry_delay_secs: u64,
    pub server_error_delay_secs: u64,
    pub network_error_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            expired_token_max_retry: EXPIRED_TOKEN_MAX_RETRY,
            server_error_max_retry: SERVER_ERROR_MAX_RETRY,
            skip_on_server_error: true,
            network_error_max_retry: None,
            rate_limit_max_retry: None,
            rate_limit_padding_secs: RATE_LIMIT_PADDING_SECS,
            default_retry_after_secs: DEFAULT_RETRY_AFTER_SECS,
            auth_retry_delay_secs: AUTH_RETRY_DELAY_SECS,
            server_error_delay_secs: SERVER_ERROR_DELAY_SECS,
            network_error_delay_secs: NETWORK_ERROR_DELAY_SECS,
        }
    }
}

/// Task cadences, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub flush_interval_secs: u64,
    pub token_refresh_interval_secs: u64,
    pub intraday_today_interval_secs: u64,
    pub intraday_yesterday_interval_secs: u64,
    pub battery_interval_secs: u64,
    pub hrv_interval_secs: u64,
    pub sleep_interval_secs: u64,
    pub activity_minutes_interval_secs: u64,
    pub spo2_interval_secs: u64,
    pub recent_activities_interval_secs: u64,
    /// Days before today included in range fetches.
    pub lookback_days: u32,
    /// Fire every task once immediately instead of waiting a full interval.
    pub run_on_start: bool,
    pub heart_rate_detail: DetailLevel,
    /// The steps resource has no per-second series.
    pub steps_detail: DetailLevel,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: FLUSH_INTERVAL_SECS,
            token_refresh_interval_secs: TOKEN_REFRESH_INTERVAL_SECS,
            intraday_today_interval_secs: INTRADAY_TODAY_INTERVAL_SECS,
            intraday_yesterday_interval_secs: INTRADAY_YESTERDAY_INTERVAL_SECS,
            battery_interval_secs: BATTERY_INTERVAL_SECS,
            hrv_interval_secs: HRV_INTERVAL_SECS,
            sleep_interval_secs: SLEEP_INTERVAL_SECS,
            activity_minutes_interval_secs: ACTIVITY_MINUTES_INTERVAL_SECS,
            spo2_interval_secs: SPO2_INTERVAL_SECS,
            recent_activities_interval_secs: RECENT_ACTIVITIES_INTERVAL_SECS,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            run_on_start: true,
            heart_rate_detail: DetailLevel::OneSecond,
            steps_detail: DetailLevel::OneMinute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"device":{"name":"Charge6"},"retry":{"server_error_max_retry":1}}"#)
                .unwrap();

        assert_eq!(config.device.name, "Charge6");
        assert_eq!(config.device.timezone, DEFAULT_TIMEZONE);
        assert_eq!(config.retry.server_error_max_retry, 1);
        assert_eq!(config.retry.expired_token_max_retry, EXPIRED_TOKEN_MAX_RETRY);
        assert!(config.retry.skip_on_server_error);
        assert_eq!(config.schedule.flush_interval_secs, FLUSH_INTERVAL_SECS);
        assert_eq!(config.schedule.heart_rate_detail, DetailLevel::OneSecond);
    }

    #[test]
    fn detail_levels_parse_from_schedule_section() {
        let config: Config =
            serde_json::from_str(r#"{"schedule":{"heart_rate_detail":"1min","steps_detail":"15MIN"}}"#)
                .unwrap();

        assert_eq!(config.schedule.heart_rate_detail, DetailLevel::OneMinute);
        assert_eq!(config.schedule.steps_detail, DetailLevel::FifteenMinutes);
    }

    #[test]
    fn api_config_debug_hides_secret() {
        let api = ApiConfig { client_secret: "hunter2".into(), ..Default::default() };
        assert!(!format!("{api:?}").contains("hunter2"));
    }
}
