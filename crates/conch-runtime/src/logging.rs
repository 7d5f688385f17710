//! Tracing setup for console applications.
//!
//! Console entries are written to stdout by the runtime, so diagnostics go
//! to stderr or a log file unless configured otherwise.
//!
//! # From configuration
//!
//! ```rust,ignore
//! let config = conch_runtime::config::load_config()?;
//! conch_runtime::logging::init_from_config(&config.logging);
//! ```
//!
//! # By hand
//!
//! ```rust,ignore
//! use conch_runtime::logging::{LoggingBuilder, SpanEvents};
//!
//! LoggingBuilder::new()
//!     .directive("conch_framework=debug")
//!     .span_events(SpanEvents::Lifecycle)
//!     .init();
//! ```

use std::io;
use std::path::{Path, PathBuf};

use tracing::{Level, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LogRotation, LoggingConfig, LoggingLevel, SpanEventConfig};

/// Preset span event sets.
///
/// Every dispatched line runs inside a `console_turn` span, so `Lifecycle`
/// prints one open/close pair per turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpanEvents {
    #[default]
    None,
    /// Creation and close.
    Lifecycle,
    /// Enter and exit.
    Active,
    Full,
}

impl SpanEvents {
    fn flags(self) -> FmtSpan {
        match self {
            Self::None => FmtSpan::NONE,
            Self::Lifecycle => FmtSpan::NEW | FmtSpan::CLOSE,
            Self::Active => FmtSpan::ACTIVE,
            Self::Full => FmtSpan::FULL,
        }
    }
}

fn config_flags(config: &SpanEventConfig) -> FmtSpan {
    [
        (config.new, FmtSpan::NEW),
        (config.enter, FmtSpan::ENTER),
        (config.exit, FmtSpan::EXIT),
        (config.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |flags, (_, flag)| flags | flag)
}

/// Installs the global subscriber described by `config`. Does nothing if one
/// is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

#[derive(Debug, Clone, PartialEq)]
enum Destination {
    Stderr,
    Stdout,
    File {
        path: PathBuf,
        rotation: LogRotation,
        max_files: usize,
    },
}

/// Builder for the global tracing subscriber.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    directives: Vec<String>,
    spans: FmtSpan,
    format: LogFormat,
    destination: Destination,
    target: bool,
    thread_ids: bool,
    source_location: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            directives: Vec::new(),
            spans: FmtSpan::NONE,
            format: LogFormat::Compact,
            destination: Destination::Stderr,
            target: true,
            thread_ids: false,
            source_location: false,
        }
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        let destination = match (config.output, &config.file_path) {
            (LogOutput::Stdout, _) => Destination::Stdout,
            (LogOutput::File, Some(path)) => Destination::File {
                path: path.clone(),
                rotation: config.rotation,
                max_files: config.max_files as usize,
            },
            _ => Destination::Stderr,
        };

        let mut builder = Self {
            level: config.level.to_tracing_level(),
            spans: config_flags(&config.span_events),
            format: config.format,
            destination,
            thread_ids: config.thread_ids,
            source_location: config.file_location,
            ..Self::default()
        };
        for (module, level) in &config.filters {
            builder = builder.filter(module, *level);
        }
        builder
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Adds a raw `EnvFilter` directive such as `conch_framework=trace`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn filter(self, module: &str, level: LoggingLevel) -> Self {
        self.directive(format!("{module}={level}"))
    }

    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.spans = events.flags();
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn to_stdout(mut self) -> Self {
        self.destination = Destination::Stdout;
        self
    }

    pub fn to_stderr(mut self) -> Self {
        self.destination = Destination::Stderr;
        self
    }

    /// Writes to `path`, rotated and pruned to `max_files`.
    pub fn to_file(mut self, path: impl Into<PathBuf>, rotation: LogRotation, max_files: usize) -> Self {
        self.destination = Destination::File {
            path: path.into(),
            rotation,
            max_files,
        };
        self
    }

    pub fn target(mut self, enabled: bool) -> Self {
        self.target = enabled;
        self
    }

    pub fn thread_ids(mut self, enabled: bool) -> Self {
        self.thread_ids = enabled;
        self
    }

    /// Include the file and line of each call site.
    pub fn source_location(mut self, enabled: bool) -> Self {
        self.source_location = enabled;
        self
    }

    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber, failing if one is already set.
    ///
    /// A log file that cannot be opened falls back to stderr with a warning.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let filter = self.env_filter();
        let (writer, fallback) = self.make_writer();
        tracing_subscriber::registry()
            .with(self.fmt_layer(writer))
            .with(filter)
            .try_init()?;

        if let Some(reason) = fallback {
            warn!(%reason, "log file unavailable, logging to stderr");
        }
        Ok(())
    }

    fn env_filter(&self) -> EnvFilter {
        // RUST_LOG replaces the configured level, directives still apply.
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_lowercase()));
        for directive in &self.directives {
            match directive.parse() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(e) => eprintln!("ignoring log directive '{directive}': {e}"),
            }
        }
        filter
    }

    fn make_writer(&self) -> (BoxMakeWriter, Option<String>) {
        match &self.destination {
            Destination::Stdout => (BoxMakeWriter::new(io::stdout), None),
            Destination::Stderr => (BoxMakeWriter::new(io::stderr), None),
            Destination::File {
                path,
                rotation,
                max_files,
            } => match open_appender(path, *rotation, *max_files) {
                Ok(appender) => (BoxMakeWriter::new(appender), None),
                Err(e) => (
                    BoxMakeWriter::new(io::stderr),
                    Some(format!("{}: {e}", path.display())),
                ),
            },
        }
    }

    fn fmt_layer(&self, writer: BoxMakeWriter) -> Box<dyn Layer<Registry> + Send + Sync> {
        let spans = self.spans.clone();

        macro_rules! decorate {
            ($layer:expr) => {
                $layer
                    .with_writer(writer)
                    .with_span_events(spans)
                    .with_target(self.target)
                    .with_thread_ids(self.thread_ids)
                    .with_file(self.source_location)
                    .with_line_number(self.source_location)
                    .boxed()
            };
        }

        match self.format {
            LogFormat::Compact => decorate!(fmt::layer().compact()),
            LogFormat::Full => decorate!(fmt::layer()),
            LogFormat::Pretty => decorate!(fmt::layer().pretty()),
            #[cfg(feature = "json-log")]
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(writer)
                .with_span_events(spans)
                .boxed(),
        }
    }
}

fn open_appender(path: &Path, rotation: LogRotation, max_files: usize) -> io::Result<RollingFileAppender> {
    let prefix = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "log path has no file name"))?
        .to_string_lossy()
        .into_owned();
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let rotation = match rotation {
        LogRotation::Never => Rotation::NEVER,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
    };

    RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(prefix)
        .max_log_files(max_files.max(1))
        .build(directory)
        .map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let mut config = LoggingConfig {
            level: LoggingLevel::Debug,
            thread_ids: true,
            file_location: true,
            ..LoggingConfig::default()
        };
        config.span_events.close = true;
        config
            .filters
            .insert("conch_framework".into(), LoggingLevel::Trace);

        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, Level::DEBUG);
        assert!(builder.thread_ids && builder.source_location);
        assert_eq!(builder.spans, FmtSpan::CLOSE);
        assert_eq!(builder.destination, Destination::Stderr);
        assert_eq!(builder.directives, vec!["conch_framework=trace".to_string()]);
    }

    #[test]
    fn test_file_output_needs_a_path() {
        let config = LoggingConfig {
            output: LogOutput::File,
            ..LoggingConfig::default()
        };
        assert_eq!(
            LoggingBuilder::from_config(&config).destination,
            Destination::Stderr
        );

        let config = LoggingConfig {
            output: LogOutput::File,
            file_path: Some(PathBuf::from("logs/conch.log")),
            rotation: LogRotation::Daily,
            ..config
        };
        assert!(matches!(
            LoggingBuilder::from_config(&config).destination,
            Destination::File {
                rotation: LogRotation::Daily,
                ..
            }
        ));
    }

    #[test]
    fn test_span_presets() {
        assert_eq!(SpanEvents::Lifecycle.flags(), FmtSpan::NEW | FmtSpan::CLOSE);
        assert_eq!(SpanEvents::None.flags(), FmtSpan::NONE);
        assert_eq!(
            config_flags(&SpanEventConfig {
                enter: true,
                exit: true,
                ..SpanEventConfig::default()
            }),
            FmtSpan::ACTIVE
        );
    }

    #[test]
    fn test_open_appender() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_appender(&dir.path().join("conch.log"), LogRotation::Never, 3).is_ok());
        assert!(open_appender(Path::new("/"), LogRotation::Never, 3).is_err());
    }
}
