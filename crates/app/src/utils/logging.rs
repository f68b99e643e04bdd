//! Process-wide tracing subscriber.
//!
//! Events go to standard output and, through a non-blocking writer, to the
//! configured log file. `RUST_LOG` overrides the default `info` filter and
//! `LOG_FORMAT=json` switches both outputs to JSON lines.

use std::fs::{File, OpenOptions};
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use vitalsync_domain::StorageConfig;

/// Keeps the file writer flushing; drop it last.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: WorkerGuard,
}

/// Install the global subscriber.
///
/// # Errors
/// Fails if the log file cannot be opened or a subscriber is already set.
pub fn init_logging(storage: &StorageConfig) -> anyhow::Result<LoggingGuard> {
    let file = open_log_file(Path::new(&storage.log_file), storage.overwrite_log_file)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|value| value.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json())
            .with(fmt::layer().json().with_ansi(false).with_writer(writer))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer())
            .with(fmt::layer().with_ansi(false).with_writer(writer))
            .try_init()?;
    }

    Ok(LoggingGuard { _file: guard })
}

/// Open `path` for appending, or truncate it first when `overwrite` is set.
/// Parent directories are created as needed.
///
/// # Errors
/// Any I/O error from creating the directory or opening the file.
pub fn open_log_file(path: &Path, overwrite: bool) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.create(true);
    if overwrite {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    options.open(path)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn overwrite_truncates_and_append_keeps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("vitalsync.log");

        open_log_file(&path, false).unwrap().write_all(b"first\n").unwrap();
        open_log_file(&path, false).unwrap().write_all(b"second\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");

        open_log_file(&path, true).unwrap().write_all(b"fresh\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");
    }
}
