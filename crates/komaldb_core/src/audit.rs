//! Human-readable operation log.
//!
//! The audit log is an append-only text sink owned by the database. Each
//! event becomes one line:
//!
//! ```text
//! 2024-05-01 12:00:00,123 - INFO - Set key 'user:1' to value '{"email":"a"}'
//! ```
//!
//! Writing the audit log is best effort: a failed write is reported through
//! `tracing` and never fails the operation being audited. The sink is flushed
//! when the log is dropped. It is never truncated or rotated here.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Local};
use komaldb_storage::StorageBackend;
use parking_lot::Mutex;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Timestamp layout of audit lines.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Severity of an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum AuditLevel {
    /// Internal events such as snapshot saves.
    Debug,
    /// Ordinary operations.
    #[default]
    Info,
    /// Caller misuse, e.g. commit without a transaction.
    Warning,
    /// Failed operations.
    Error,
}

impl AuditLevel {
    /// Upper-case level name as written to the log.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AuditLevel::Debug => "DEBUG",
            AuditLevel::Info => "INFO",
            AuditLevel::Warning => "WARNING",
            AuditLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(AuditLevel::Debug),
            "INFO" => Ok(AuditLevel::Info),
            "WARNING" | "WARN" => Ok(AuditLevel::Warning),
            "ERROR" => Ok(AuditLevel::Error),
            other => Err(CoreError::invalid_config(format!(
                "unknown audit level: {other}"
            ))),
        }
    }
}

/// Owned handle to the audit sink.
pub struct AuditLog {
    sink: Option<Mutex<Box<dyn StorageBackend>>>,
    min_level: AuditLevel,
    sync_each: bool,
}

impl AuditLog {
    /// Creates an audit log writing to `backend`.
    ///
    /// Records below `min_level` are dropped. With `sync_each`, the backend is
    /// synced after every record.
    #[must_use]
    pub fn new(backend: Box<dyn StorageBackend>, min_level: AuditLevel, sync_each: bool) -> Self {
        Self {
            sink: Some(Mutex::new(backend)),
            min_level,
            sync_each,
        }
    }

    /// Creates an audit log that discards everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            sink: None,
            min_level: AuditLevel::Error,
            sync_each: false,
        }
    }

    /// Returns true if records at `level` are written.
    #[must_use]
    pub fn enabled(&self, level: AuditLevel) -> bool {
        self.sink.is_some() && level >= self.min_level
    }

    /// Renders one audit line, including the trailing newline.
    ///
    /// Line breaks inside `message` are escaped so every record stays on one
    /// line.
    #[must_use]
    pub fn format_line(timestamp: &DateTime<Local>, level: AuditLevel, message: &str) -> String {
        let message = message.replace('\r', "\\r").replace('\n', "\\n");
        format!(
            "{} - {} - {}\n",
            timestamp.format(TIMESTAMP_FORMAT),
            level,
            message
        )
    }

    /// Writes a record.
    pub fn record(&self, level: AuditLevel, message: impl fmt::Display) {
        let Some(sink) = &self.sink else {
            return;
        };
        if level < self.min_level {
            return;
        }

        let line = Self::format_line(&Local::now(), level, &message.to_string());
        let mut sink = sink.lock();
        let result = sink.append(line.as_bytes()).and_then(|_| {
            if self.sync_each {
                sink.sync()
            } else {
                Ok(())
            }
        });
        if let Err(e) = result {
            warn!(error = %e, "failed to write audit record");
        }
    }

    /// Writes a DEBUG record.
    pub fn debug(&self, message: impl fmt::Display) {
        self.record(AuditLevel::Debug, message);
    }

    /// Writes an INFO record.
    pub fn info(&self, message: impl fmt::Display) {
        self.record(AuditLevel::Info, message);
    }

    /// Writes a WARNING record.
    pub fn warning(&self, message: impl fmt::Display) {
        self.record(AuditLevel::Warning, message);
    }

    /// Writes an ERROR record.
    pub fn error(&self, message: impl fmt::Display) {
        self.record(AuditLevel::Error, message);
    }

    /// Flushes the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot flush.
    pub fn flush(&self) -> CoreResult<()> {
        if let Some(sink) = &self.sink {
            sink.lock().flush()?;
        }
        Ok(())
    }
}

impl fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLog")
            .field("enabled", &self.sink.is_some())
            .field("min_level", &self.min_level)
            .field("sync_each", &self.sync_each)
            .finish()
    }
}

impl Drop for AuditLog {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "failed to flush audit log");
        }
    }
}
