//! File logging for the orchestrator and monitor.
//!
//! Lines go to `conductor.log` in the data directory, one per event:
//!
//! ```text
//! 2026-10-18T09:14:02.115Z WARN  conductor::monitor  Bottleneck detected: resource-constraint-general
//! ```
//!
//! What goes where:
//! - ERROR: the CLI gave up on a command
//! - WARN: bottlenecks and monitor phases that failed
//! - INFO: task transitions, unblocks, risks, monitor start/stop
//! - DEBUG: ignored mutations on unknown ids, config and plan loading
//! - TRACE: per-tick timing
//!
//! Until [`init`] runs every macro is a no-op, so library users and tests
//! stay silent. `CONDUCTOR_LOG=<level>` overrides the level chosen by
//! `--debug`.

use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;

use crate::{Error, Result};

pub const LOG_FILE: &str = "conductor.log";
pub const LEVEL_ENV: &str = "CONDUCTOR_LOG";

static LOGGER: OnceLock<Logger> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(Error::Validation(format!("Unknown log level: {}", other))),
        }
    }
}

/// An open log file plus the most verbose level it accepts.
pub struct Logger {
    level: LogLevel,
    path: PathBuf,
    file: Mutex<File>,
}

impl Logger {
    /// Create (or truncate) `conductor.log` inside `dir`.
    pub fn open(dir: &Path, level: LogLevel) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(LOG_FILE);
        let file = File::create(&path)?;
        Ok(Self {
            level,
            path,
            file: Mutex::new(file),
        })
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.level
    }

    pub fn write(&self, level: LogLevel, target: &str, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut file = self.file.lock();
        // A full disk must not take the orchestrator down with it.
        let _ = writeln!(file, "{} {:<5} {}  {}", stamp, level, target, args);
    }
}

/// Level for a run: `CONDUCTOR_LOG` if set and valid, else debug or info.
pub fn level_from_env(debug: bool) -> LogLevel {
    let fallback = if debug { LogLevel::Debug } else { LogLevel::Info };
    std::env::var(LEVEL_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

/// Start logging into `dir` for the rest of the process.
///
/// Returns the log file path. A second call keeps the first logger.
pub fn init(dir: &Path, debug: bool) -> Result<PathBuf> {
    if let Some(existing) = LOGGER.get() {
        return Ok(existing.path.clone());
    }
    let logger = Logger::open(dir, level_from_env(debug))?;
    let path = logger.path.clone();
    let _ = LOGGER.set(logger);
    Ok(path)
}

pub fn enabled(level: LogLevel) -> bool {
    LOGGER.get().is_some_and(|l| l.enabled(level))
}

#[doc(hidden)]
pub fn write(level: LogLevel, target: &str, args: fmt::Arguments<'_>) {
    if let Some(logger) = LOGGER.get() {
        logger.write(level, target, args);
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __clog_at {
    ($level:expr, $($arg:tt)*) => {
        if $crate::log::enabled($level) {
            $crate::log::write($level, module_path!(), format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! clog {
    ($($arg:tt)*) => { $crate::__clog_at!($crate::log::LogLevel::Info, $($arg)*) };
}

#[macro_export]
macro_rules! clog_error {
    ($($arg:tt)*) => { $crate::__clog_at!($crate::log::LogLevel::Error, $($arg)*) };
}

#[macro_export]
macro_rules! clog_warn {
    ($($arg:tt)*) => { $crate::__clog_at!($crate::log::LogLevel::Warn, $($arg)*) };
}

#[macro_export]
macro_rules! clog_debug {
    ($($arg:tt)*) => { $crate::__clog_at!($crate::log::LogLevel::Debug, $($arg)*) };
}

#[macro_export]
macro_rules! clog_trace {
    ($($arg:tt)*) => { $crate::__clog_at!($crate::log::LogLevel::Trace, $($arg)*) };
}
