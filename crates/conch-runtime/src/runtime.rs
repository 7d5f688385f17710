//! The interactive console loop.
//!
//! [`ConsoleRuntime`] owns a [`ConsoleSession`] and drives it from an
//! [`InputSource`]. Console entries fan out to an in-memory history, the
//! printer task and, when configured, the JSON-lines mirror.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use conch_runtime::ConsoleRuntime;
//!
//! // Loads conch.toml from the current directory, registers linked commands
//! let mut runtime = ConsoleRuntime::builder().build()?;
//! let stats = runtime.run().await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use conch_core::{BroadcastSink, FanoutSink, LogEntry, LogSink, MemorySink};
use conch_framework::{
    CommandRegistry, ConsoleSession, Execution, LineParser, TargetInstances,
};
use serde::Serialize;
use tokio::io::AsyncWrite;
use tokio::signal;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, info, span, warn};

use crate::config::{ConchConfig, ConfigLoader, validate_config};
use crate::error::RuntimeResult;
use crate::input::{InputSource, StdinSource};
use crate::logging;
use crate::mirror::spawn_mirror;
use crate::output::spawn_printer;

/// Counters for one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeStats {
    /// Lines read from the input source.
    pub lines: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Prompt input refused by the pending prompt.
    pub rejected: u64,
    /// Turns that left a prompt pending.
    pub prompts: u64,
    /// Commands that continued in the background.
    pub background: u64,
}

impl RuntimeStats {
    fn record(&mut self, execution: &Execution) {
        self.lines += 1;
        match execution {
            Execution::Nothing | Execution::Value(_) => self.succeeded += 1,
            Execution::Prompt(_) => self.prompts += 1,
            Execution::Pending(_) => self.background += 1,
            Execution::Rejected => self.rejected += 1,
            Execution::Failed => self.failed += 1,
        }
    }
}

/// A console session wired to configuration, output and an input loop.
pub struct ConsoleRuntime {
    config: ConchConfig,
    session: ConsoleSession,
    history: Arc<MemorySink>,
    output: Arc<BroadcastSink>,
    shutdown: CancellationToken,
}

impl ConsoleRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// A runtime over every command in the registration slice.
    ///
    /// Does not touch the global tracing subscriber; see
    /// [`logging::init_from_config`].
    pub fn from_config(config: &ConchConfig) -> Self {
        Self::assemble(
            config.clone(),
            CommandRegistry::collect_registered(),
            TargetInstances::new(),
            None,
            Vec::new(),
        )
    }

    fn assemble(
        config: ConchConfig,
        mut registry: CommandRegistry,
        instances: TargetInstances,
        parser: Option<Arc<dyn LineParser>>,
        extra_sinks: Vec<Arc<dyn LogSink>>,
    ) -> Self {
        if config.runtime.builtin_commands {
            #[cfg(feature = "builtin-commands")]
            conch_framework::register_builtins(&mut registry);
            #[cfg(not(feature = "builtin-commands"))]
            warn!("builtin_commands is set but the builtin-commands feature is disabled");
        }

        let history = Arc::new(MemorySink::new(config.console.history_limit));
        let output = Arc::new(BroadcastSink::new(config.runtime.output_buffer));
        let mut fanout = FanoutSink::new()
            .with(history.clone())
            .with(output.clone());
        for sink in extra_sinks {
            fanout.push(sink);
        }

        let shutdown = CancellationToken::new();
        let mut session = ConsoleSession::builder()
            .registry(registry)
            .instances(instances)
            .sink(Arc::new(fanout))
            .config(config.console.clone())
            .app(config.app.clone())
            .shutdown(shutdown.clone());
        if let Some(parser) = parser {
            session = session.parser(parser);
        }
        let session = session.build();

        info!(
            console = %config.console.name,
            commands = session.registry().len(),
            "Console runtime initialized"
        );

        Self {
            config,
            session,
            history,
            output,
            shutdown,
        }
    }

    pub fn config(&self) -> &ConchConfig {
        &self.config
    }

    pub fn session(&self) -> &ConsoleSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ConsoleSession {
        &mut self.session
    }

    pub fn instances(&self) -> &TargetInstances {
        self.session.instances()
    }

    /// The most recent console entries, bounded by `console.history_limit`.
    pub fn history(&self) -> &MemorySink {
        &self.history
    }

    /// A live feed of console entries.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.output.subscribe()
    }

    /// Cancelled by the `exit` command or a shutdown signal.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs one line outside the loop.
    pub fn execute(&mut self, line: &str) -> Execution {
        self.session.execute(line)
    }

    /// Reads stdin and prints to stdout until `exit`, end of input, Ctrl+C
    /// or SIGTERM.
    pub async fn run(&mut self) -> RuntimeResult<RuntimeStats> {
        let mut input = StdinSource::new(self.config.runtime.prompt_symbol.clone());
        self.run_until(&mut input, tokio::io::stdout(), shutdown_signal())
            .await
    }

    /// Runs until `exit` or the end of `input`.
    pub async fn run_with<I, W>(&mut self, input: &mut I, output: W) -> RuntimeResult<RuntimeStats>
    where
        I: InputSource + ?Sized,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.run_until(input, output, std::future::pending()).await
    }

    /// Runs until `exit`, the end of `input`, or `signal` resolves.
    pub async fn run_until<I, W, F>(
        &mut self,
        input: &mut I,
        output: W,
        signal: F,
    ) -> RuntimeResult<RuntimeStats>
    where
        I: InputSource + ?Sized,
        W: AsyncWrite + Unpin + Send + 'static,
        F: Future<Output = ()>,
    {
        let stop = CancellationToken::new();
        let printer = spawn_printer(self.output.subscribe(), output, stop.clone());
        let mirror = self
            .config
            .runtime
            .mirror_path
            .clone()
            .map(|path| spawn_mirror(path, self.output.subscribe(), stop.clone()));

        tokio::pin!(signal);
        let mut stats = RuntimeStats::default();
        info!("Console is running. Type 'exit' to stop.");

        let result = loop {
            if self.shutdown.is_cancelled() {
                break Ok(());
            }

            let mode = self
                .session
                .pending_prompt()
                .map(|prompt| prompt.input_mode())
                .unwrap_or_default();

            let line = tokio::select! {
                _ = self.shutdown.cancelled() => break Ok(()),
                _ = &mut signal => {
                    info!("Received shutdown signal");
                    self.shutdown.cancel();
                    break Ok(());
                }
                line = input.next_line(mode) => line,
            };

            match line {
                Ok(Some(line)) => {
                    let span = span!(Level::DEBUG, "turn", line = stats.lines + 1);
                    let _enter = span.enter();
                    let execution = self.session.execute(&line);
                    stats.record(&execution);
                }
                Ok(None) => {
                    debug!("input closed");
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
        };

        stop.cancel();
        printer.await??;
        if let Some(mirror) = mirror {
            let written = mirror.await??;
            debug!(written, "mirror finished");
        }
        result?;

        info!(
            lines = stats.lines,
            failed = stats.failed,
            "Console stopped"
        );
        Ok(stats)
    }
}

impl std::fmt::Debug for ConsoleRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleRuntime")
            .field("session", &self.session)
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}

/// Waits for Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = signal::ctrl_c() => {
                        if let Err(e) = result {
                            warn!(error = %e, "Ctrl+C handler failed");
                            std::future::pending::<()>().await;
                        }
                    }
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                if signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler failed");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`ConsoleRuntime`].
///
/// # Example
///
/// ```rust,ignore
/// let mut runtime = ConsoleRuntime::builder()
///     .config_file("config/conch.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<ConchConfig>,
    registry: Option<CommandRegistry>,
    instances: TargetInstances,
    parser: Option<Arc<dyn LineParser>>,
    sinks: Vec<Arc<dyn LogSink>>,
    init_logging: bool,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            config: None,
            registry: None,
            instances: TargetInstances::new(),
            parser: None,
            sinks: Vec::new(),
            init_logging: true,
        }
    }

    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration above files and environment.
    pub fn merge(mut self, config: ConchConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses `config` as is, skipping file and environment loading.
    pub fn config(mut self, config: ConchConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replaces the registration slice with an explicit registry.
    pub fn registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn instances(mut self, instances: TargetInstances) -> Self {
        self.instances = instances;
        self
    }

    pub fn parser(mut self, parser: Arc<dyn LineParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// An additional destination for console entries.
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Leaves the global tracing subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    pub fn build(self) -> RuntimeResult<ConsoleRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => self.config_loader.load()?,
        };
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let registry = self
            .registry
            .unwrap_or_else(CommandRegistry::collect_registered);
        Ok(ConsoleRuntime::assemble(
            config,
            registry,
            self.instances,
            self.parser,
            self.sinks,
        ))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use async_trait::async_trait;
    use conch_core::{CommandOutput, CommandResult, InputMode, KeyPrompt, NavigationKey};
    use conch_framework::{Command, CommandContext, CommandTarget};

    use super::*;
    use crate::input::ScriptSource;

    fn runtime(registry: CommandRegistry, config: ConchConfig) -> ConsoleRuntime {
        ConsoleRuntime::builder()
            .config(config)
            .registry(registry)
            .without_logging()
            .build()
            .unwrap()
    }

    fn quiet_config() -> ConchConfig {
        let mut config = ConchConfig::default();
        config.console.include_stack_trace_in_command_errors = false;
        config
    }

    #[tokio::test]
    async fn test_script_runs_until_exit() {
        let mut registry = CommandRegistry::new();
        registry.add_target(CommandTarget::function("add", |a: i32, b: i32| a + b));
        let mut runtime = runtime(registry, quiet_config());

        let mut input = ScriptSource::new(["add 2 3", "frobnicate", "exit", "add 1 1"]);
        let stats = runtime
            .run_with(&mut input, tokio::io::sink())
            .await
            .unwrap();

        assert_eq!(stats.lines, 3);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(input.remaining(), 1);
        assert!(runtime.shutdown_token().is_cancelled());
        assert_eq!(
            runtime.history().messages(),
            vec![
                "Command returned '5'",
                "Command frobnicate doesn't exist",
                "Goodbye"
            ]
        );
    }

    #[tokio::test]
    async fn test_end_of_input_stops_loop() {
        let mut runtime = runtime(CommandRegistry::new(), quiet_config());
        let mut input = ScriptSource::new(["hello"]);
        let stats = runtime.run_with(&mut input, Vec::new()).await.unwrap();
        assert_eq!(stats.succeeded, 1);
        assert!(!runtime.shutdown_token().is_cancelled());
    }

    struct Recording {
        script: ScriptSource,
        modes: Vec<InputMode>,
    }

    #[async_trait]
    impl InputSource for Recording {
        async fn next_line(&mut self, mode: InputMode) -> io::Result<Option<String>> {
            self.modes.push(mode);
            self.script.next_line(mode).await
        }
    }

    struct Pick {
        prompt: Arc<KeyPrompt>,
    }

    impl Command for Pick {
        fn name(&self) -> &str {
            "pick"
        }

        fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
            if ctx.is_prompt(&self.prompt) && self.prompt.key() == NavigationKey::Confirm {
                return Ok(CommandOutput::None);
            }
            Ok(CommandOutput::prompt(self.prompt.clone()))
        }
    }

    #[tokio::test]
    async fn test_key_prompt_switches_read_mode() {
        let mut registry = CommandRegistry::new();
        registry.add_command(Pick {
            prompt: Arc::new(KeyPrompt::new()),
        });
        let mut runtime = runtime(registry, quiet_config());

        let mut input = Recording {
            script: ScriptSource::new(["pick", "down", "enter", "hello"]),
            modes: Vec::new(),
        };
        let stats = runtime
            .run_with(&mut input, tokio::io::sink())
            .await
            .unwrap();

        assert_eq!(
            input.modes,
            vec![
                InputMode::Line,
                InputMode::Key,
                InputMode::Key,
                InputMode::Line,
                InputMode::Line
            ]
        );
        assert_eq!(stats.prompts, 2);
        assert_eq!(stats.succeeded, 2);
    }

    struct Silent;

    #[async_trait]
    impl InputSource for Silent {
        async fn next_line(&mut self, _mode: InputMode) -> io::Result<Option<String>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_signal_stops_waiting_loop() {
        let mut runtime = runtime(CommandRegistry::new(), quiet_config());
        let stats = runtime
            .run_until(&mut Silent, tokio::io::sink(), async {})
            .await
            .unwrap();
        assert_eq!(stats, RuntimeStats::default());
        assert!(runtime.shutdown_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_mirror_receives_console_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.jsonl");
        let mut config = quiet_config();
        config.runtime.mirror_path = Some(path.clone());
        let mut runtime = runtime(CommandRegistry::new(), config);

        let mut input = ScriptSource::new(["echo mirrored", "exit"]);
        runtime
            .run_with(&mut input, tokio::io::sink())
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let messages: Vec<String> = contents
            .lines()
            .map(|line| serde_json::from_str::<LogEntry>(line).unwrap().message)
            .collect();
        assert_eq!(messages, vec!["mirrored", "Goodbye"]);
    }

    #[test]
    fn test_builtins_can_be_disabled() {
        let mut config = quiet_config();
        config.runtime.builtin_commands = false;
        let runtime = runtime(CommandRegistry::new(), config);
        assert!(runtime.session().registry().is_empty());
    }

    #[test]
    fn test_builtins_follow_the_feature() {
        let runtime = runtime(CommandRegistry::new(), quiet_config());
        let help = runtime.session().registry().get("help");
        assert_eq!(help.is_some(), cfg!(feature = "builtin-commands"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = ConchConfig::default();
        config.runtime.output_buffer = 0;
        let result = ConsoleRuntime::builder()
            .config(config)
            .registry(CommandRegistry::new())
            .without_logging()
            .build();
        assert!(result.is_err());
    }
}
