//! Logging setup with rotation support

use crate::error::{AppError, Result};
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Default log filename
const LOG_FILENAME: &str = "headset_status.log";

/// Logger setup
pub struct LogSetup {
    pub level: LevelFilter,
    /// `None` logs to the terminal only
    pub log_dir: Option<PathBuf>,
    pub max_file_size: u64,
    pub max_files: u32,
}

impl Default for LogSetup {
    fn default() -> Self {
        Self {
            level: LevelFilter::Warn,
            log_dir: None,
            max_file_size: 1024 * 1024, // 1MB
            max_files: 3,
        }
    }
}

/// Initialize the logging system. Terminal output goes to stderr so command
/// output on stdout stays machine readable.
pub fn init_logging(setup: LogSetup) -> Result<()> {
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .set_location_level(LevelFilter::Debug)
        .set_thread_level(LevelFilter::Off)
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        setup.level,
        log_config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    let log_path = match &setup.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let log_path = dir.join(LOG_FILENAME);
            rotate_logs(&log_path, setup.max_file_size, setup.max_files)?;

            let log_file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .map_err(AppError::IoError)?;
            loggers.push(WriteLogger::new(setup.level, log_config, log_file));
            Some(log_path)
        }
        None => None,
    };

    CombinedLogger::init(loggers)
        .map_err(|e| AppError::ConfigError(format!("Logger init failed: {}", e)))?;

    log::debug!("Logging initialized at level {:?}", setup.level);
    if let Some(path) = log_path {
        log::debug!("Log file: {:?}", path);
    }

    Ok(())
}

/// Rotate log files if the current log exceeds max size
fn rotate_logs(log_path: &Path, max_size: u64, max_files: u32) -> Result<()> {
    if !log_path.exists() {
        return Ok(());
    }

    let metadata = fs::metadata(log_path)?;
    if metadata.len() < max_size {
        return Ok(());
    }

    // Delete oldest file if at max
    let oldest = log_path.with_extension(format!("log.{}", max_files));
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }

    for i in (1..max_files).rev() {
        let old_name = log_path.with_extension(format!("log.{}", i));
        let new_name = log_path.with_extension(format!("log.{}", i + 1));
        if old_name.exists() {
            fs::rename(&old_name, &new_name)?;
        }
    }

    fs::rename(log_path, log_path.with_extension("log.1"))?;

    Ok(())
}

/// Parse log level from string
pub fn parse_log_level(level_str: &str) -> LevelFilter {
    match level_str.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" | "warning" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Warn,
    }
}
