//! Host log forwarding.
//!
//! Mobile hosts want core logs in their native pipeline (Logcat, os_log)
//! rather than on stdout. The tracing layer in `core-runtime` converts each
//! event into a [`LogEntry`] and hands it to a [`LoggerSink`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Structured log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Module path the event was emitted from.
    pub target: String,
    pub message: String,
    /// Extra event fields, ordered by name.
    pub fields: BTreeMap<String, String>,
    /// Name of the innermost active span, if any.
    pub span: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: BTreeMap::new(),
            span: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_span(mut self, span: impl Into<String>) -> Self {
        self.span = Some(span.into());
        self
    }
}

/// Receives log entries on the thread that emitted them.
///
/// Implementations must not block for long: audio callbacks log through the
/// same path.
pub trait LoggerSink: Send + Sync {
    fn log(&self, entry: &LogEntry) -> Result<()>;

    /// Entries below this level are dropped before reaching `log`.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Writes entries to stderr in a Logcat-like layout. Meant for development.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    pub tag: String,
    pub min_level: LogLevel,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self {
            tag: "PlaybackCore".to_string(),
            min_level: LogLevel::Info,
        }
    }
}

impl ConsoleLogger {
    pub fn format(&self, entry: &LogEntry) -> String {
        let mut line = format!(
            "{} {}/{} {}: {}",
            entry.timestamp.format("%m-%d %H:%M:%S%.3f"),
            &entry.level.as_str()[..1],
            self.tag,
            entry.target,
            entry.message
        );
        for (key, value) in &entry.fields {
            line.push_str(&format!(" {}={}", key, value));
        }
        line
    }
}

impl LoggerSink for ConsoleLogger {
    fn log(&self, entry: &LogEntry) -> Result<()> {
        if entry.level >= self.min_level {
            eprintln!("{}", self.format(entry));
        }
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}
