//! Console log entries and sinks.
//!
//! Console output is separate from diagnostic `tracing` output: it is what
//! the user of the console sees. Commands write through a [`Logger`], which
//! forwards [`LogEntry`] values to an injected [`LogSink`].
//!
//! | sink | purpose |
//! |---|---|
//! | [`TracingSink`] | forwards entries to `tracing` at the matching level |
//! | [`MemorySink`] | bounded in-memory history |
//! | [`BroadcastSink`] | fans entries out over a tokio broadcast channel |
//! | [`FanoutSink`] | writes to several sinks in order |

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Severity of a console log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    /// Request to clear the visible console.
    Clear,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Clear => "Clear",
        };
        f.write_str(name)
    }
}

/// One line of console output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    pub message: String,
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_tag: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            time: OffsetDateTime::now_utc(),
            message: message.into(),
            level,
            color_tag: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn clear() -> Self {
        Self::new(LogLevel::Clear, "Console cleared")
    }

    pub fn with_color_tag(mut self, tag: impl Into<String>) -> Self {
        self.color_tag = Some(tag.into());
        self
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clock = self
            .time
            .format(format_description!("[hour]:[minute]:[second]"))
            .map_err(|_| fmt::Error)?;
        write!(f, "[{clock}] [{}] {}", self.level, self.message)
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Destination for console log entries.
pub trait LogSink: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

impl<F> LogSink for F
where
    F: Fn(&LogEntry) + Send + Sync,
{
    fn log(&self, entry: &LogEntry) {
        self(entry)
    }
}

/// Forwards entries to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, entry: &LogEntry) {
        match entry.level {
            LogLevel::Info => info!(target: "conch::console", "{}", entry.message),
            LogLevel::Warning => warn!(target: "conch::console", "{}", entry.message),
            LogLevel::Error => error!(target: "conch::console", "{}", entry.message),
            LogLevel::Clear => info!(target: "conch::console", "console cleared"),
        }
    }
}

/// Bounded in-memory history; the oldest entry is dropped when full.
#[derive(Debug)]
pub struct MemorySink {
    entries: Mutex<VecDeque<LogEntry>>,
    limit: usize,
}

impl MemorySink {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(limit.min(1024))),
            limit: limit.max(1),
        }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl LogSink for MemorySink {
    fn log(&self, entry: &LogEntry) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.limit {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
    }
}

/// Publishes entries on a tokio broadcast channel.
///
/// Entries logged while nobody is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<LogEntry>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl LogSink for BroadcastSink {
    fn log(&self, entry: &LogEntry) {
        let _ = self.sender.send(entry.clone());
    }
}

/// Writes every entry to each inner sink in order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn push(&mut self, sink: Arc<dyn LogSink>) {
        self.sinks.push(sink);
    }
}

impl LogSink for FanoutSink {
    fn log(&self, entry: &LogEntry) {
        for sink in &self.sinks {
            sink.log(entry);
        }
    }
}

// ============================================================================
// Logger
// ============================================================================

/// Cheap, cloneable handle commands use to write console output.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
}

impl Logger {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    pub fn log(&self, entry: LogEntry) {
        self.sink.log(&entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogEntry::info(message));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogEntry::warning(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogEntry::error(message));
    }

    pub fn clear(&self) {
        self.log(LogEntry::clear());
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}
