//! Logging initialization for the back-office client.
//!
//! TUI mode: logs to `{state}/logs/backoffice-{datetime}.log`
//! CLI mode: logs to stderr

use anyhow::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Result of logging initialization
pub struct LoggingHandle {
    /// Guard that must be kept alive for the duration of the program.
    /// When dropped, ensures all buffered logs are flushed.
    pub _guard: Option<WorkerGuard>,

    /// Path to the log file (only set in TUI mode with file logging enabled)
    pub log_file_path: Option<PathBuf>,
}

/// Effective filter directive: `--debug` wins over the configured level
fn effective_level(config: &Config, debug_override: bool) -> String {
    if debug_override {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    }
}

fn log_file_name(timestamp: chrono::DateTime<chrono::Utc>) -> String {
    format!("backoffice-{}.log", timestamp.format("%Y%m%dT%H%M%SZ"))
}

/// Initialize logging based on mode and configuration.
///
/// The terminal UI owns stdout/stderr, so in TUI mode logs go to a file.
pub fn init_logging(
    config: &Config,
    is_tui_mode: bool,
    debug_override: bool,
) -> Result<LoggingHandle> {
    let log_level = effective_level(config, debug_override);
    let filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or(log_level));

    if is_tui_mode && config.logging.to_file {
        let logs_dir = config.logs_path();
        std::fs::create_dir_all(&logs_dir)?;

        let log_filename = log_file_name(chrono::Utc::now());
        let log_file_path = logs_dir.join(&log_filename);

        let file_appender = tracing_appender::rolling::never(&logs_dir, &log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();

        Ok(LoggingHandle {
            _guard: Some(guard),
            log_file_path: Some(log_file_path),
        })
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();

        Ok(LoggingHandle {
            _guard: None,
            log_file_path: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.paths.state = temp_dir.path().to_string_lossy().to_string();
        config
    }

    #[test]
    fn test_logs_path_inside_state_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let logs_dir = config.logs_path();
        assert!(logs_dir.ends_with("logs"));
        assert!(logs_dir.starts_with(temp_dir.path()));
    }

    #[test]
    fn test_log_file_name_format() {
        let ts = chrono::Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(log_file_name(ts), "backoffice-20260304T050607Z.log");
    }

    #[test]
    fn test_debug_flag_overrides_configured_level() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.logging.level = "warn".to_string();

        assert_eq!(effective_level(&config, false), "warn");
        assert_eq!(effective_level(&config, true), "debug");
    }
}
