// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only logger for per-category station logs.

use depot_core::LogMode;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Which log file a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Master,
    Dispatcher,
    TicketOffice,
    Driver,
    Passenger,
    Stats,
}

impl LogCategory {
    fn file_name(&self) -> &'static str {
        match self {
            LogCategory::Master => "master.log",
            LogCategory::Dispatcher => "dispatcher.log",
            LogCategory::TicketOffice => "ticket_office.log",
            LogCategory::Driver => "driver.log",
            LogCategory::Passenger => "passenger.log",
            LogCategory::Stats => "stats.log",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

impl LogLevel {
    fn label(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Append-only logger writing timestamped lines to
/// `<log_dir>/<category>.log`.
///
/// Each `append()` opens, writes, and closes the file; write frequency is
/// low enough that this is fine. Failures warn via tracing and never
/// propagate: logging must not break the station.
pub struct StationLogger {
    log_dir: PathBuf,
    mode: LogMode,
}

impl StationLogger {
    pub fn new(log_dir: PathBuf, mode: LogMode) -> Self {
        Self { log_dir, mode }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Whether a line of this category/level is written under the current
    /// mode. STATS lines always pass.
    fn enabled(&self, category: LogCategory, level: LogLevel) -> bool {
        if category == LogCategory::Stats {
            return true;
        }
        match self.mode {
            LogMode::Verbose => true,
            LogMode::Summary => level != LogLevel::Debug,
            LogMode::Minimal => matches!(level, LogLevel::Warn | LogLevel::Error),
        }
    }

    /// Append one line. Format: `[{epoch_ms}] [LEVEL] message`
    pub fn append(&self, category: LogCategory, level: LogLevel, message: &str) {
        if !self.enabled(category, level) {
            return;
        }
        let path = self.log_dir.join(category.file_name());
        if let Err(e) = self.write_line(&path, level, message) {
            tracing::warn!(
                file = category.file_name(),
                error = %e,
                "failed to write station log"
            );
        }
    }

    /// STATS line, written in every mode.
    pub fn stats(&self, message: &str) {
        self.append(LogCategory::Stats, LogLevel::Info, message);
    }

    fn write_line(&self, path: &Path, level: LogLevel, message: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        writeln!(file, "[{}] [{}] {}", ts, level.label(), message)
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
