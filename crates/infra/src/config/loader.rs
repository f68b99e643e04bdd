//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Start from a file if one is found, otherwise from defaults
//! 2. Apply environment variable overrides
//! 3. Validate (time zone, URLs, cadences, detail levels)
//!
//! The file is taken from `VITALSYNC_CONFIG` when set, otherwise probed in
//! the working directory (`vitalsync.toml`, `vitalsync.json`, `config.toml`,
//! `config.json`). JSON and TOML are detected by extension.
//!
//! ## Environment Variables
//! | Variable | Field |
//! |---|---|
//! | `FITBIT_LOG_FILE_PATH` | `storage.log_file` |
//! | `OVERWRITE_LOG_FILE` | `storage.overwrite_log_file` |
//! | `TOKEN_FILE_PATH` | `storage.token_file` |
//! | `VICTORIA_METRICS_URL` | `sink.url` |
//! | `CLIENT_ID` / `CLIENT_SECRET` | `api.client_id` / `api.client_secret` |
//! | `DEVICENAME` | `device.name` |
//! | `LOCAL_TIMEZONE` | `device.timezone` |
//! | `FITBIT_LANGUAGE` | `api.language` |
//! | `FITBIT_API_BASE_URL` / `FITBIT_TOKEN_URL` | `api.base_url` / `api.token_url` |
//! | `EXPIRED_TOKEN_MAX_RETRY` | `retry.expired_token_max_retry` |
//! | `SERVER_ERROR_MAX_RETRY` | `retry.server_error_max_retry` |
//! | `SKIP_REQUEST_ON_SERVER_ERROR` | `retry.skip_on_server_error` |
//! | `NETWORK_ERROR_MAX_RETRY` | `retry.network_error_max_retry` |
//! | `RATE_LIMIT_MAX_RETRY` | `retry.rate_limit_max_retry` |
//! | `AUTO_UPDATE_DATE_RANGE` | `schedule.lookback_days` |
//! | `FLUSH_INTERVAL_SECONDS` | `schedule.flush_interval_secs` |
//! | `FITBIT_REFRESH_TOKEN` | `initial_refresh_token` |
//! | `HEART_RATE_DETAIL_LEVEL` / `STEPS_DETAIL_LEVEL` | `schedule.heart_rate_detail` / `schedule.steps_detail` |

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono_tz::Tz;
use url::Url;
use vitalsync_domain::{Config, DetailLevel, Result, VitalSyncError};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "VITALSYNC_CONFIG";

/// Load, override and validate the configuration.
///
/// # Errors
/// Returns `VitalSyncError::Config` if the file cannot be read or parsed,
/// an environment value is malformed, or validation fails.
pub fn load() -> Result<Config> {
    let mut config = match std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from) {
        Some(path) => load_from_file(&path)?,
        None => match probe_config_paths() {
            Some(path) => load_from_file(&path)?,
            None => {
                tracing::debug!("no config file found, starting from defaults");
                Config::default()
            }
        },
    };

    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `VitalSyncError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(VitalSyncError::Config(format!("Config file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| VitalSyncError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| VitalSyncError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| VitalSyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(VitalSyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file in the working directory.
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    ["vitalsync.toml", "vitalsync.json", "config.toml", "config.json"]
        .into_iter()
        .map(|name| cwd.join(name))
        .find(|path| path.exists())
}

/// Overlay every recognised environment variable onto `config`.
///
/// # Errors
/// Returns `VitalSyncError::Config` naming the variable whose value does not
/// parse.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    override_string("FITBIT_LOG_FILE_PATH", &mut config.storage.log_file);
    override_string("TOKEN_FILE_PATH", &mut config.storage.token_file);
    override_string("VICTORIA_METRICS_URL", &mut config.sink.url);
    override_string("CLIENT_ID", &mut config.api.client_id);
    override_string("CLIENT_SECRET", &mut config.api.client_secret);
    override_string("DEVICENAME", &mut config.device.name);
    override_string("LOCAL_TIMEZONE", &mut config.device.timezone);
    override_string("FITBIT_LANGUAGE", &mut config.api.language);
    override_string("FITBIT_API_BASE_URL", &mut config.api.base_url);
    override_string("FITBIT_TOKEN_URL", &mut config.api.token_url);

    config.storage.overwrite_log_file =
        env_bool("OVERWRITE_LOG_FILE", config.storage.overwrite_log_file);
    config.retry.skip_on_server_error =
        env_bool("SKIP_REQUEST_ON_SERVER_ERROR", config.retry.skip_on_server_error);

    if let Some(value) = env_parse("EXPIRED_TOKEN_MAX_RETRY")? {
        config.retry.expired_token_max_retry = value;
    }
    if let Some(value) = env_parse("SERVER_ERROR_MAX_RETRY")? {
        config.retry.server_error_max_retry = value;
    }
    if let Some(value) = env_parse("NETWORK_ERROR_MAX_RETRY")? {
        config.retry.network_error_max_retry = Some(value);
    }
    if let Some(value) = env_parse("RATE_LIMIT_MAX_RETRY")? {
        config.retry.rate_limit_max_retry = Some(value);
    }
    if let Some(value) = env_parse("AUTO_UPDATE_DATE_RANGE")? {
        config.schedule.lookback_days = value;
    }
    if let Some(value) = env_parse("FLUSH_INTERVAL_SECONDS")? {
        config.schedule.flush_interval_secs = value;
    }
    if let Some(token) = env_value("FITBIT_REFRESH_TOKEN") {
        config.initial_refresh_token = Some(token);
    }
    if let Some(level) = env_parse("HEART_RATE_DETAIL_LEVEL")? {
        config.schedule.heart_rate_detail = level;
    }
    if let Some(level) = env_parse("STEPS_DETAIL_LEVEL")? {
        config.schedule.steps_detail = level;
    }

    Ok(())
}

/// Check values serde cannot: the zone, the endpoint URLs and the schedule.
///
/// # Errors
/// Returns `VitalSyncError::Config` describing the first invalid value.
pub fn validate(config: &Config) -> Result<()> {
    Tz::from_str(&config.device.timezone).map_err(|_| {
        VitalSyncError::Config(format!(
            "LOCAL_TIMEZONE '{}' is not a valid IANA time zone",
            config.device.timezone
        ))
    })?;

    for (name, value) in [
        ("api.base_url", &config.api.base_url),
        ("api.token_url", &config.api.token_url),
        ("sink.url", &config.sink.url),
    ] {
        Url::parse(value)
            .map_err(|e| VitalSyncError::Config(format!("{name} '{value}' is not a valid URL: {e}")))?;
    }

    let schedule = &config.schedule;
    for (name, secs) in [
        ("schedule.flush_interval_secs", schedule.flush_interval_secs),
        ("schedule.token_refresh_interval_secs", schedule.token_refresh_interval_secs),
        ("schedule.intraday_today_interval_secs", schedule.intraday_today_interval_secs),
        ("schedule.intraday_yesterday_interval_secs", schedule.intraday_yesterday_interval_secs),
        ("schedule.battery_interval_secs", schedule.battery_interval_secs),
        ("schedule.hrv_interval_secs", schedule.hrv_interval_secs),
        ("schedule.sleep_interval_secs", schedule.sleep_interval_secs),
        ("schedule.activity_minutes_interval_secs", schedule.activity_minutes_interval_secs),
        ("schedule.spo2_interval_secs", schedule.spo2_interval_secs),
        ("schedule.recent_activities_interval_secs", schedule.recent_activities_interval_secs),
    ] {
        if secs == 0 {
            return Err(VitalSyncError::Config(format!("{name} must be at least one second")));
        }
    }

    if schedule.steps_detail == DetailLevel::OneSecond {
        return Err(VitalSyncError::Config(
            "schedule.steps_detail '1sec' is not offered for steps".into(),
        ));
    }

    Ok(())
}

/// Non-empty value of `key`, trimmed.
fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn override_string(key: &str, target: &mut String) {
    if let Some(value) = env_value(key) {
        *target = value;
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_value(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| VitalSyncError::Config(format!("Invalid value for {key} ('{raw}'): {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    env_value(key)
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::{Builder, NamedTempFile};

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        let result = f();
        for (key, _) in vars {
            std::env::remove_var(key);
        }
        result
    }

    fn temp_config(extension: &str, contents: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(extension).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_env_bool_parsing() {
        with_env(
            &[("TEST_BOOL_YES", "yes"), ("TEST_BOOL_UPPER", "TRUE"), ("TEST_BOOL_OFF", "off")],
            || {
                assert!(env_bool("TEST_BOOL_YES", false));
                assert!(env_bool("TEST_BOOL_UPPER", false));
                assert!(!env_bool("TEST_BOOL_OFF", true));
                assert!(env_bool("TEST_BOOL_MISSING", true));
            },
        );
    }

    #[test]
    fn test_env_overrides_apply() {
        let config = with_env(
            &[
                ("DEVICENAME", "Charge6"),
                ("LOCAL_TIMEZONE", "America/New_York"),
                ("SERVER_ERROR_MAX_RETRY", "1"),
                ("NETWORK_ERROR_MAX_RETRY", "4"),
                ("SKIP_REQUEST_ON_SERVER_ERROR", "false"),
                ("AUTO_UPDATE_DATE_RANGE", "7"),
                ("FITBIT_REFRESH_TOKEN", " rt-boot "),
            ],
            || {
                let mut config = Config::default();
                apply_env_overrides(&mut config).map(|()| config)
            },
        )
        .unwrap();

        assert_eq!(config.device.name, "Charge6");
        assert_eq!(config.device.timezone, "America/New_York");
        assert_eq!(config.retry.server_error_max_retry, 1);
        assert_eq!(config.retry.network_error_max_retry, Some(4));
        assert!(!config.retry.skip_on_server_error);
        assert_eq!(config.schedule.lookback_days, 7);
        assert_eq!(config.initial_refresh_token.as_deref(), Some("rt-boot"));
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let result = with_env(&[("EXPIRED_TOKEN_MAX_RETRY", "five")], || {
            apply_env_overrides(&mut Config::default())
        });
        assert!(
            matches!(result, Err(VitalSyncError::Config(ref msg)) if msg.contains("EXPIRED_TOKEN_MAX_RETRY"))
        );
    }

    #[test]
    fn test_env_overrides_file_values() {
        let file = temp_config(".toml", "[device]\nname = \"FromFile\"\ntimezone = \"Europe/Berlin\"\n");
        let config = with_env(
            &[(CONFIG_PATH_ENV, file.path().to_str().unwrap()), ("DEVICENAME", "FromEnv")],
            load,
        )
        .unwrap();

        assert_eq!(config.device.name, "FromEnv");
        assert_eq!(config.device.timezone, "Europe/Berlin");
    }

    #[test]
    fn test_load_from_file_json() {
        let file = temp_config(".json", r#"{"sink":{"url":"http://vm:8428/write"},"schedule":{"run_on_start":false}}"#);
        let config = load_from_file(file.path()).unwrap();

        assert_eq!(config.sink.url, "http://vm:8428/write");
        assert!(!config.schedule.run_on_start);
        assert_eq!(config.retry, vitalsync_domain::RetryConfig::default());
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Path::new("/nonexistent/vitalsync.toml"));
        assert!(matches!(result, Err(VitalSyncError::Config(_))));
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("device: {}", Path::new("vitalsync.yaml"));
        assert!(matches!(result, Err(VitalSyncError::Config(ref msg)) if msg.contains("yaml")));
    }

    #[test]
    fn test_validate_rejects_unknown_zone() {
        let mut config = Config::default();
        config.device.timezone = "Mars/Olympus_Mons".into();
        assert!(matches!(validate(&config), Err(VitalSyncError::Config(ref msg)) if msg.contains("Mars")));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = Config::default();
        config.sink.url = "localhost 8428".into();
        assert!(matches!(validate(&config), Err(VitalSyncError::Config(ref msg)) if msg.contains("sink.url")));
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_cadences() {
        let mut config = Config::default();
        config.schedule.battery_interval_secs = 0;
        assert!(
            matches!(validate(&config), Err(VitalSyncError::Config(ref msg)) if msg.contains("battery_interval_secs"))
        );

        let mut config = Config::default();
        config.schedule.token_refresh_interval_secs = 0;
        assert!(
            matches!(validate(&config), Err(VitalSyncError::Config(ref msg)) if msg.contains("token_refresh_interval_secs"))
        );

        let mut config = Config::default();
        config.schedule.flush_interval_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_cadence_in_file_fails_load() {
        let file = temp_config(".toml", "[schedule]\nspo2_interval_secs = 0\n");
        let result = with_env(&[(CONFIG_PATH_ENV, file.path().to_str().unwrap())], load);
        assert!(matches!(result, Err(VitalSyncError::Config(ref msg)) if msg.contains("spo2_interval_secs")));
    }

    #[test]
    fn test_detail_level_overrides() {
        let config = with_env(
            &[("HEART_RATE_DETAIL_LEVEL", "1min"), ("STEPS_DETAIL_LEVEL", "15min")],
            || {
                let mut config = Config::default();
                apply_env_overrides(&mut config).map(|()| config)
            },
        )
        .unwrap();
        assert_eq!(config.schedule.heart_rate_detail, DetailLevel::OneMinute);
        assert_eq!(config.schedule.steps_detail, DetailLevel::FifteenMinutes);

        let result = with_env(&[("HEART_RATE_DETAIL_LEVEL", "2min")], || {
            apply_env_overrides(&mut Config::default())
        });
        assert!(
            matches!(result, Err(VitalSyncError::Config(ref msg)) if msg.contains("HEART_RATE_DETAIL_LEVEL"))
        );
    }

    #[test]
    fn test_validate_rejects_per_second_steps() {
        let mut config = Config::default();
        config.schedule.steps_detail = DetailLevel::OneSecond;
        assert!(matches!(validate(&config), Err(VitalSyncError::Config(ref msg)) if msg.contains("steps_detail")));
    }
}
