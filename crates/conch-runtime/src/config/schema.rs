//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use conch_framework::{AppInfo, ConsoleConfig};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConchConfig {
    /// Console behaviour: error rendering, return value logging, history.
    #[serde(default)]
    pub console: ConsoleConfig,

    /// Application metadata shown by `version`.
    #[serde(default)]
    pub app: AppInfo,

    /// Tracing subscriber settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Interactive loop settings.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Verbosity of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LoggingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LoggingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line format of the tracing output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    #[cfg(feature = "json-log")]
    Json,
}

/// Where tracing output goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Console output is printed on stdout, so diagnostics default to stderr.
    #[default]
    Stderr,
    Stdout,
    File,
}

/// Rotation of the log file when `output = "file"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global level; `RUST_LOG` takes precedence when set.
    pub level: LoggingLevel,

    pub format: LogFormat,

    pub output: LogOutput,

    /// Log file for `output = "file"`.
    pub file_path: Option<PathBuf>,

    pub rotation: LogRotation,

    /// Rotated files to keep.
    pub max_files: u32,

    pub thread_ids: bool,

    /// Include file and line of the call site.
    pub file_location: bool,

    pub span_events: SpanEventConfig,

    /// Per-module levels, e.g. `conch_framework = "debug"`.
    pub filters: BTreeMap<String, LoggingLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LoggingLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            file_path: None,
            rotation: LogRotation::Never,
            max_files: 5,
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
            filters: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Runtime
// =============================================================================

/// Interactive loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Printed before each line is read from stdin.
    pub prompt_symbol: String,

    /// Append every console entry as a JSON line to this file.
    pub mirror_path: Option<PathBuf>,

    /// Register `help`, `echo`, `exit` and the other built-in commands.
    pub builtin_commands: bool,

    /// Capacity of the console output channel.
    pub output_buffer: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            prompt_symbol: "> ".to_string(),
            mirror_path: None,
            builtin_commands: true,
            output_buffer: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_sections_use_defaults() {
        let config: ConchConfig = serde_json::from_str(
            r#"{ "console": { "log_return_values": false }, "logging": { "level": "debug" } }"#,
        )
        .unwrap();

        assert!(!config.console.log_return_values);
        assert!(config.console.include_stack_trace_in_command_errors);
        assert_eq!(config.logging.level, LoggingLevel::Debug);
        assert_eq!(config.logging.output, LogOutput::Stderr);
        assert_eq!(config.runtime, RuntimeConfig::default());
    }

    #[test]
    fn test_level_names() {
        assert_eq!(LoggingLevel::Warn.to_string(), "warn");
        assert_eq!(LoggingLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
