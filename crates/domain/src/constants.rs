//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Upstream API
pub const DEFAULT_API_BASE_URL: &str = "https://api.fitbit.com";
pub const DEFAULT_TOKEN_URL: &str = "https://api.fitbit.com/oauth2/token";
pub const DEFAULT_LANGUAGE: &str = "en_US";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

// Downstream sink
pub const DEFAULT_SINK_URL: &str = "http://localhost:8428/write";
pub const DEFAULT_SINK_TIMEOUT_SECS: u64 = 30;

// Local files
pub const DEFAULT_TOKEN_FILE: &str = "tokens.json";
pub const DEFAULT_LOG_FILE: &str = "vitalsync.log";

// Device context
pub const DEFAULT_DEVICE_NAME: &str = "Tracker";
pub const DEFAULT_TIMEZONE: &str = "UTC";

// Retry policy
pub const EXPIRED_TOKEN_MAX_RETRY: u32 = 5;
pub const SERVER_ERROR_MAX_RETRY: u32 = 3;
pub const RATE_LIMIT_PADDING_SECS: u64 = 300;
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;
pub const AUTH_RETRY_DELAY_SECS: u64 = 30;
pub const SERVER_ERROR_DELAY_SECS: u64 = 120;
pub const NETWORK_ERROR_DELAY_SECS: u64 = 30;

// Cadences (seconds)
pub const FLUSH_INTERVAL_SECS: u64 = 30;
pub const TOKEN_REFRESH_INTERVAL_SECS: u64 = 3600;
pub const INTRADAY_TODAY_INTERVAL_SECS: u64 = 180;
pub const INTRADAY_YESTERDAY_INTERVAL_SECS: u64 = 3600;
pub const BATTERY_INTERVAL_SECS: u64 = 1200;
pub const HRV_INTERVAL_SECS: u64 = 3 * 3600;
pub const SLEEP_INTERVAL_SECS: u64 = 4 * 3600;
pub const ACTIVITY_MINUTES_INTERVAL_SECS: u64 = 6 * 3600;
pub const SPO2_INTERVAL_SECS: u64 = 6 * 3600;
pub const RECENT_ACTIVITIES_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_LOOKBACK_DAYS: u32 = 1;

// Endpoint range limits (days per request)
pub const HRV_MAX_RANGE_DAYS: u32 = 30;
pub const SLEEP_MAX_RANGE_DAYS: u32 = 100;
pub const ACTIVITY_MINUTES_MAX_RANGE_DAYS: u32 = 365;

pub const RECENT_ACTIVITIES_PAGE_SIZE: u32 = 50;

// Measurement names
pub const MEASUREMENT_BATTERY: &str = "DeviceBatteryLevel";
pub const MEASUREMENT_HEART_RATE_INTRADAY: &str = "HeartRate_Intraday";
pub const MEASUREMENT_STEPS_INTRADAY: &str = "Steps_Intraday";
pub const MEASUREMENT_HRV: &str = "HRV";
pub const MEASUREMENT_SLEEP_SUMMARY: &str = "Sleep Summary";
pub const MEASUREMENT_ACTIVITY_MINUTES: &str = "Activity Minutes";
pub const MEASUREMENT_SPO2: &str = "SPO2";
pub const MEASUREMENT_ACTIVITY_RECORDS: &str = "Activity Records";

pub const ACTIVITY_MINUTE_TYPES: [&str; 4] =
    ["minutesSedentary", "minutesLightlyActive", "minutesFairlyActive", "minutesVeryActive"];
