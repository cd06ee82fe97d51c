//!
//! Provides centralized logging configuration with:
//! - Log file rotation based on size (via background task)
//! - Periodic cleanup of old logs
//! - Per-project log storage in .agentdx/logs/
//! - Configurable via environment variables
//!

use anyhow::Result;
use chrono::{Duration, Utc};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::constants::{
    DEFAULT_LOG_MAX_FILES, DEFAULT_LOG_MAX_SIZE_MB, DEFAULT_LOG_RETENTION_DAYS, LOG_DIR_NAME,
    LOG_FILE_NAME,
};

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    /// Convert to tracing Level
    pub fn as_tracing_level(&self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Log rotation configuration
#[derive(Debug, Clone)]
pub struct LogRotationConfig {
    /// Maximum size of each log file in MB
    pub max_size_mb: usize,
    /// Maximum number of log files to retain
    pub max_files: usize,
    /// Number of days to retain log files
    pub retention_days: i64,
}

impl LogRotationConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            max_size_mb: std::env::var("AGENTDX_LOG_MAX_SIZE_MB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_LOG_MAX_SIZE_MB),
            max_files: std::env::var("AGENTDX_LOG_MAX_FILES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_LOG_MAX_FILES),
            retention_days: std::env::var("AGENTDX_LOG_RETENTION_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_LOG_RETENTION_DAYS),
        }
    }
}

/// Get the log directory path for a given state directory
pub fn get_log_dir(state_dir: &Path) -> PathBuf {
    state_dir.join(LOG_DIR_NAME)
}

/// Get the log file path
pub fn get_log_file(state_dir: &Path) -> PathBuf {
    get_log_dir(state_dir).join(LOG_FILE_NAME)
}

/// Ensure the log directory exists
pub fn ensure_log_dir(log_dir: &Path) -> Result<()> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)?;
        tracing::debug!("Created log directory: {:?}", log_dir);
    }
    Ok(())
}

/// Check if current log file exceeds max size and rotate if needed
pub fn rotate_if_needed(log_dir: &Path, config: &LogRotationConfig) -> Result<()> {
    let current_path = log_dir.join(LOG_FILE_NAME);

    if let Ok(metadata) = fs::metadata(&current_path) {
        let file_size_mb = metadata.len() / (1024 * 1024);
        if file_size_mb >= config.max_size_mb as u64 {
            tracing::info!(
                "Log file size limit reached ({} MB >= {} MB), rotating",
                file_size_mb,
                config.max_size_mb
            );

            for i in (1..config.max_files).rev() {
                let from = log_dir.join(format!("{}.{}", LOG_FILE_NAME, i));
                let to = log_dir.join(format!("{}.{}", LOG_FILE_NAME, i + 1));
                if from.exists() {
                    fs::rename(&from, &to)?;
                }
            }

            if current_path.exists() {
                let rotated_path = log_dir.join(format!("{}.1", LOG_FILE_NAME));
                fs::rename(&current_path, &rotated_path)?;
                tracing::debug!("Rotated log file to: {:?}", rotated_path);
            }
        }
    }

    Ok(())
}

/// Remove old log files based on retention period
pub fn cleanup_old_logs(log_dir: &Path, config: &LogRotationConfig) -> Result<()> {
    let retention_duration = Duration::days(config.retention_days);
    let cutoff_time = Utc::now() - retention_duration;

    if !log_dir.exists() {
        return Ok(());
    }

    let mut log_files: Vec<(PathBuf, chrono::DateTime<Utc>)> = Vec::new();

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Some(file_name) = path.file_name() {
            let file_name = file_name.to_string_lossy();
            if file_name.starts_with(LOG_FILE_NAME) {
                if let Ok(metadata) = entry.metadata() {
                    if let Ok(modified) = metadata.modified() {
                        let modified_time: chrono::DateTime<Utc> = modified.into();
                        log_files.push((path, modified_time));
                    }
                }
            }
        }
    }

    log_files.sort_by(|a, b| a.1.cmp(&b.1));

    let mut removed_count = 0;
    for (path, modified_time) in log_files {
        if modified_time < cutoff_time {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("Failed to remove old log file {:?}: {}", path, e);
            } else {
                tracing::debug!(
                    "Removed old log file {:?} (modified: {})",
                    path,
                    modified_time
                );
                removed_count += 1;
            }
        }
    }

    if removed_count > 0 {
        tracing::info!(
            "Removed {} old log files (older than {} days)",
            removed_count,
            config.retention_days
        );
    }

    Ok(())
}

/// Initialize the logger
///
/// # Arguments
/// * `state_dir` - Path to the project's `.agentdx` directory (logs go in `state_dir/logs/`)
/// * `log_level` - Log level to use
/// * `quiet` - If true, suppress console output (log only to file)
///
/// # Returns
/// Returns the log directory path and rotation configuration
pub fn init_logger(
    state_dir: &Path,
    log_level: LogLevel,
    quiet: bool,
) -> Result<(PathBuf, LogRotationConfig)> {
    let log_dir = get_log_dir(state_dir);
    ensure_log_dir(&log_dir)?;

    let config = LogRotationConfig::from_env();

    rotate_if_needed(&log_dir, &config)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_NAME);

    let env_filter = EnvFilter::new(log_level.as_str()).add_directive(
        "sqlx=warn,notify=warn"
            .parse()
            .unwrap_or_else(|_| "warn".parse().unwrap()),
    );

    let timer = fmt::time::ChronoLocal::rfc_3339();
    let subscriber = tracing_subscriber::registry().with(env_filter);

    if quiet {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_timer(timer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()?;
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_timer(timer.clone())
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .with(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_timer(timer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()?;
    }

    tracing::info!(
        "Logger initialized: level={}, log_dir={:?}, max_size_mb={}, max_files={}, retention_days={}",
        log_level.as_str(),
        log_dir,
        config.max_size_mb,
        config.max_files,
        config.retention_days,
    );

    Ok((log_dir, config))
}

/// Start periodic log cleanup task
///
/// Runs every 24 hours by default (`AGENTDX_LOG_CLEANUP_INTERVAL_HOURS`)
/// and removes old log files based on retention_days.
pub fn start_cleanup_task(
    log_dir: PathBuf,
    config: LogRotationConfig,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let cleanup_interval_hours: u64 = std::env::var("AGENTDX_LOG_CLEANUP_INTERVAL_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(24);

        let cleanup_interval = Duration::hours(cleanup_interval_hours as i64)
            .to_std()
            .unwrap();

        tracing::info!(
            "Log cleanup task started: interval={}h, retention_days={}",
            cleanup_interval_hours,
            config.retention_days
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(cleanup_interval) => {
                    if let Err(e) = rotate_if_needed(&log_dir, &config) {
                        tracing::error!("Failed to rotate log file: {}", e);
                    }
                    if let Err(e) = cleanup_old_logs(&log_dir, &config) {
                        tracing::error!("Failed to cleanup old logs: {}", e);
                    }
                }
                _ = cancel_token.cancelled() => {
                    tracing::info!("Log cleanup task stopped");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("error"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("ERROR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("invalid"), None);
    }

    #[test]
    fn test_get_log_dir() {
        let state_dir = PathBuf::from("/test/.agentdx");
        let log_dir = get_log_dir(&state_dir);
        assert_eq!(log_dir, PathBuf::from("/test/.agentdx/logs"));
    }

    #[test]
    fn test_rotate_if_needed() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path();

        let current_path = log_dir.join(LOG_FILE_NAME);
        let mut file = File::create(&current_path).unwrap();
        write!(file, "small file").unwrap();

        let config = LogRotationConfig {
            max_size_mb: 10,
            max_files: 5,
            retention_days: 5,
        };

        assert!(rotate_if_needed(log_dir, &config).is_ok());
        assert!(current_path.exists());

        let large_content = "x".repeat(11 * 1024 * 1024);
        let mut file = File::create(&current_path).unwrap();
        write!(file, "{large_content}").unwrap();

        assert!(rotate_if_needed(log_dir, &config).is_ok());
        assert!(!current_path.exists());

        let rotated_path = log_dir.join(format!("{}.1", LOG_FILE_NAME));
        assert!(rotated_path.exists());
    }

    #[test]
    fn test_cleanup_old_logs() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path();

        let current_path = log_dir.join(LOG_FILE_NAME);
        let mut file = File::create(&current_path).unwrap();
        write!(file, "current").unwrap();

        let rotated_path = log_dir.join(format!("{}.1", LOG_FILE_NAME));
        let mut file = File::create(&rotated_path).unwrap();
        write!(file, "old").unwrap();

        let old_time = Utc::now() - Duration::days(10);
        fs::set_file_times(&rotated_path, old_time.into(), old_time.into()).unwrap();

        let config = LogRotationConfig {
            max_size_mb: 10,
            max_files: 5,
            retention_days: 5,
        };

        assert!(cleanup_old_logs(log_dir, &config).is_ok());
        assert!(current_path.exists());
        assert!(!rotated_path.exists());
    }
}
