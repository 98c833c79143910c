//! Custom logging module.
//!
//! The logger writes formatted records to stderr and can forward each line
//! to a capture callback, which the demo uses to show recent activity.

use crate::error::AppError;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

type Callback = Box<dyn Fn(String) + Send + Sync>;
type SharedCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Format a log record into a string for display
///
pub fn format_log(record: &Record) -> String {
    let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
    let level_str = match record.level() {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    };
    format!("{} {} [{}] {}", timestamp, level_str, record.target(), record.args())
}

/// Logger for the stores and the demo binary.
///
#[derive(Clone)]
pub struct StoreLogger {
    level: LevelFilter,
    stderr: bool,
    log_callback: Arc<Mutex<Option<SharedCallback>>>,
}

impl StoreLogger {
    pub fn new(level: LevelFilter) -> Self {
        StoreLogger {
            level,
            stderr: true,
            log_callback: Arc::new(Mutex::new(None)),
        }
    }

    /// Stop writing to stderr; only the callback sees records.
    ///
    pub fn quiet(mut self) -> Self {
        self.stderr = false;
        self
    }

    pub fn set_log_callback(&self, callback: Callback) {
        *self
            .log_callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::from(callback));
    }
}

impl Log for StoreLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let formatted = format_log(record);
        if self.stderr {
            let _ = writeln!(std::io::stderr(), "{}", formatted);
        }
        // Released before the call so the callback may log itself.
        let callback = self
            .log_callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback(formatted);
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install `logger` as the global logger. Fails if one is already installed.
///
pub fn init(logger: StoreLogger) -> Result<(), AppError> {
    let level = logger.level;
    log::set_boxed_logger(Box::new(logger)).map_err(|e| AppError::Logger(e.to_string()))?;
    log::set_max_level(level);
    Ok(())
}
