//! The console session state machine.
//!
//! A [`ConsoleSession`] is either **idle** or **awaiting a prompt**:
//!
//! ```text
//!            ┌──────────── non-prompt result / error ────────────┐
//!            ▼                                                    │
//!   ┌──────────────┐  command returns a prompt  ┌─────────────────┴─┐
//!   │     Idle     │ ─────────────────────────▶ │  AwaitingPrompt   │
//!   └──────────────┘                            └───────────────────┘
//!                                                  ▲     │ prompt returns
//!                                                  └─────┘ another prompt
//! ```
//!
//! While idle, input is tokenized and the first token names the command.
//! While awaiting a prompt, input goes to the prompt; if it accepts, the same
//! command runs again with the tokens the prompt prepared. State changes only
//! after a dispatch completes; nothing a command does escapes
//! [`ConsoleSession::execute`].
//!
//! # Example
//!
//! ```rust,ignore
//! let mut registry = CommandRegistry::new();
//! registry.add_target(CommandTarget::function("add", |a: i32, b: i32| a + b));
//!
//! let mut session = ConsoleSession::builder()
//!     .registry(registry)
//!     .sink(Arc::new(TracingSink))
//!     .build();
//!
//! let execution = session.execute("add 2 3");
//! assert_eq!(execution.value(), Some(&Value::I32(5)));
//! ```

use std::sync::Arc;

use conch_core::{
    ArgumentToken, CommandError, CommandOutput, CommandResult, LogSink, Logger, PromptHandle,
    TracingSink, Value,
};
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, span, trace};

use crate::command::CommandHandle;
use crate::context::{CommandContext, ConsoleView};
use crate::instance::TargetInstances;
use crate::parser::{LineParser, ShellLineParser};
use crate::registry::CommandRegistry;
use crate::report::{Execution, Reporter, TaskSpawner, TokioSpawner, catch_panic};
use crate::settings::{AppInfo, ConsoleConfig};

/// Where the session is between turns.
#[derive(Clone, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingPrompt {
        command: CommandHandle,
        /// Name the command was invoked with.
        name: String,
        prompt: PromptHandle,
    },
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::AwaitingPrompt { name, .. } => f
                .debug_struct("AwaitingPrompt")
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

/// Result of the synchronous half of a turn.
enum Dispatch {
    Done(Execution),
    Invoked {
        command: CommandHandle,
        name: String,
        result: CommandResult,
    },
}

/// An interactive command console.
///
/// Callers serialize turns; the session is not shared between threads while
/// a turn runs.
pub struct ConsoleSession {
    registry: CommandRegistry,
    instances: TargetInstances,
    parser: Arc<dyn LineParser>,
    reporter: Reporter,
    app: AppInfo,
    shutdown: CancellationToken,
    state: SessionState,
    last_value: Option<Value>,
}

impl ConsoleSession {
    pub fn builder() -> ConsoleSessionBuilder {
        ConsoleSessionBuilder::default()
    }

    /// A session over `registry` with default settings, logging to `tracing`.
    pub fn new(registry: CommandRegistry) -> Self {
        Self::builder().registry(registry).build()
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Registry access for setup; do not call while a turn is running.
    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    pub fn instances(&self) -> &TargetInstances {
        &self.instances
    }

    pub fn logger(&self) -> &Logger {
        self.reporter.logger()
    }

    pub fn config(&self) -> &ConsoleConfig {
        self.reporter.config()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        !self.state.is_idle()
    }

    pub fn pending_prompt(&self) -> Option<&PromptHandle> {
        match &self.state {
            SessionState::AwaitingPrompt { prompt, .. } => Some(prompt),
            SessionState::Idle => None,
        }
    }

    /// Value returned by the most recent settled turn.
    pub fn last_value(&self) -> Option<&Value> {
        self.last_value.as_ref()
    }

    /// Cancelled by the `exit` command.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Drops any pending prompt and returns to idle.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
    }

    // ─── Turns ───────────────────────────────────────────────────────────────

    /// Runs one input line. Asynchronous commands continue in the background.
    pub fn execute(&mut self, input: &str) -> Execution {
        let dispatch = self.dispatch(input, None);
        self.settle(dispatch)
    }

    /// Runs pre-tokenized input; token 0 names the command.
    pub fn execute_tokens(&mut self, tokens: Vec<ArgumentToken>) -> Execution {
        let input = tokens
            .iter()
            .map(ArgumentToken::text)
            .collect::<Vec<_>>()
            .join(" ");
        let dispatch = self.dispatch(&input, Some(tokens));
        self.settle(dispatch)
    }

    /// Runs one input line and waits for an asynchronous command to finish.
    pub async fn execute_async(&mut self, input: &str) -> Execution {
        match self.dispatch(input, None) {
            Dispatch::Invoked {
                name,
                result: Ok(CommandOutput::Task(task)),
                ..
            } => {
                self.state = SessionState::Idle;
                let execution = self.reporter.complete(&name, task).await;
                self.last_value = execution.value().cloned();
                execution
            }
            other => self.settle(other),
        }
    }

    fn dispatch(&self, input: &str, pretokenized: Option<Vec<ArgumentToken>>) -> Dispatch {
        let span = span!(Level::DEBUG, "console_turn", busy = self.is_busy());
        let _enter = span.enter();

        if let SessionState::AwaitingPrompt {
            command,
            name,
            prompt,
        } = &self.state
        {
            if !prompt.can_execute(input) {
                trace!(command = %name, "prompt rejected input");
                return Dispatch::Done(Execution::Rejected);
            }
            let arguments = if prompt.reparses_raw_input() {
                match pretokenized {
                    Some(tokens) => tokens,
                    None => self.parser.parse_line(input),
                }
            } else {
                prompt.prepare(input)
            };
            let mut tokens = Vec::with_capacity(arguments.len() + 1);
            tokens.push(ArgumentToken::literal(name.clone()));
            tokens.extend(arguments);

            debug!(command = %name, "continuing prompt");
            let result = self.run(command, name, input, tokens, Some(prompt.clone()));
            return Dispatch::Invoked {
                command: command.clone(),
                name: name.clone(),
                result,
            };
        }

        let tokens = pretokenized.unwrap_or_else(|| self.parser.parse_line(input));
        let Some(first) = tokens.first() else {
            return Dispatch::Done(Execution::Nothing);
        };
        let name = first.text().to_lowercase();
        let Some(command) = self.registry.get(&name) else {
            self.reporter
                .report_error(&name, &CommandError::not_found(&name));
            return Dispatch::Done(Execution::Failed);
        };

        debug!(command = %name, arguments = tokens.len() - 1, "dispatching command");
        let result = self.run(&command, &name, input, tokens, None);
        Dispatch::Invoked {
            command,
            name,
            result,
        }
    }

    fn run(
        &self,
        command: &CommandHandle,
        name: &str,
        input: &str,
        tokens: Vec<ArgumentToken>,
        prompt: Option<PromptHandle>,
    ) -> CommandResult {
        let mut ctx = CommandContext::new(input, name, tokens, prompt, self.view());
        catch_panic(|| command.run(&mut ctx))
    }

    /// Commits state for a finished dispatch and reports its outcome.
    fn settle(&mut self, dispatch: Dispatch) -> Execution {
        let (command, name, result) = match dispatch {
            Dispatch::Done(execution) => return execution,
            Dispatch::Invoked {
                command,
                name,
                result,
            } => (command, name, result),
        };

        match result {
            Ok(CommandOutput::Prompt(prompt)) => {
                self.state = SessionState::AwaitingPrompt {
                    command,
                    name,
                    prompt: prompt.clone(),
                };
                self.last_value = None;
                Execution::Prompt(prompt)
            }
            other => {
                self.state = SessionState::Idle;
                let execution = self.reporter.report(&name, other);
                self.last_value = execution.value().cloned();
                execution
            }
        }
    }

    fn view(&self) -> ConsoleView<'_> {
        ConsoleView {
            registry: &self.registry,
            instances: &self.instances,
            reporter: &self.reporter,
            app: &self.app,
            shutdown: &self.shutdown,
        }
    }
}

impl std::fmt::Debug for ConsoleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSession")
            .field("commands", &self.registry.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ConsoleSession`].
#[derive(Default)]
pub struct ConsoleSessionBuilder {
    registry: Option<CommandRegistry>,
    instances: Option<TargetInstances>,
    parser: Option<Arc<dyn LineParser>>,
    sink: Option<Arc<dyn LogSink>>,
    spawner: Option<Arc<dyn TaskSpawner>>,
    config: ConsoleConfig,
    app: AppInfo,
    shutdown: Option<CancellationToken>,
}

impl ConsoleSessionBuilder {
    pub fn registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn instances(mut self, instances: TargetInstances) -> Self {
        self.instances = Some(instances);
        self
    }

    pub fn parser(mut self, parser: Arc<dyn LineParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Console output destination. Defaults to [`TracingSink`].
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn spawner(mut self, spawner: Arc<dyn TaskSpawner>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    pub fn config(mut self, config: ConsoleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn app(mut self, app: AppInfo) -> Self {
        self.app = app;
        self
    }

    pub fn shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    pub fn build(self) -> ConsoleSession {
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let spawner = self.spawner.unwrap_or_else(|| Arc::new(TokioSpawner));
        ConsoleSession {
            registry: self.registry.unwrap_or_default(),
            instances: self.instances.unwrap_or_default(),
            parser: self
                .parser
                .unwrap_or_else(|| Arc::new(ShellLineParser::default())),
            reporter: Reporter::new(Logger::new(sink), Arc::new(self.config), spawner),
            app: self.app,
            shutdown: self.shutdown.unwrap_or_default(),
            state: SessionState::Idle,
            last_value: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::command::Command;
    use crate::target::CommandTarget;
    use conch_core::{KeyPrompt, LinePrompt, MemorySink, NavigationKey, TextPrompt};

    fn session(registry: CommandRegistry) -> (ConsoleSession, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let config = ConsoleConfig {
            include_stack_trace_in_command_errors: false,
            ..ConsoleConfig::default()
        };
        let session = ConsoleSession::builder()
            .registry(registry)
            .sink(sink.clone())
            .config(config)
            .build();
        (session, sink)
    }

    /// Asks for a name with a text prompt, then greets.
    struct Greet {
        prompt: Arc<TextPrompt>,
    }

    impl Command for Greet {
        fn name(&self) -> &str {
            "greet"
        }

        fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
            if ctx.is_prompt(&self.prompt) {
                let name = ctx.argument(0).map(|t| t.text().to_string()).unwrap_or_default();
                return Ok(CommandOutput::Value(Value::String(format!("hello {name}"))));
            }
            ctx.check_argument_count(0, 0)?;
            Ok(CommandOutput::prompt(self.prompt.clone()))
        }
    }

    #[test]
    fn test_empty_input_does_nothing() {
        let (mut session, sink) = session(CommandRegistry::new());
        assert!(matches!(session.execute("   "), Execution::Nothing));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_unknown_command_logs_once() {
        let (mut session, sink) = session(CommandRegistry::new());
        assert!(session.execute("Frobnicate now").is_failed());
        assert_eq!(sink.messages(), vec!["Command frobnicate doesn't exist"]);
        assert!(session.state().is_idle());
    }

    #[test]
    fn test_value_is_returned_and_logged() {
        let mut registry = CommandRegistry::new();
        registry.add_target(CommandTarget::function("add", |a: i32, b: i32| a + b));
        let (mut session, sink) = session(registry);

        let execution = session.execute("ADD 2 3");
        assert_eq!(execution.value(), Some(&Value::I32(5)));
        assert_eq!(session.last_value(), Some(&Value::I32(5)));
        assert_eq!(sink.messages(), vec!["Command returned '5'"]);
    }

    #[test]
    fn test_text_prompt_round_trip() {
        let mut registry = CommandRegistry::new();
        registry.add_command(Greet {
            prompt: Arc::new(TextPrompt::new()),
        });
        let (mut session, sink) = session(registry);

        assert!(matches!(session.execute("greet"), Execution::Prompt(_)));
        assert!(session.is_busy());

        // Prompt input is not looked up as a command.
        let execution = session.execute("greet again");
        assert_eq!(execution.value(), Some(&Value::from("hello greet again")));
        assert!(session.state().is_idle());
        assert_eq!(sink.messages(), vec!["Command returned 'hello greet again'"]);
    }

    #[test]
    fn test_failure_during_prompt_returns_to_idle() {
        struct Strict {
            prompt: Arc<TextPrompt>,
        }

        impl Command for Strict {
            fn name(&self) -> &str {
                "strict"
            }

            fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
                if ctx.is_prompt(&self.prompt) {
                    return Err(CommandError::command("not good enough"));
                }
                Ok(CommandOutput::prompt(self.prompt.clone()))
            }
        }

        let mut registry = CommandRegistry::new();
        registry.add_command(Strict {
            prompt: Arc::new(TextPrompt::new()),
        });
        let (mut session, sink) = session(registry);

        session.execute("strict");
        assert!(session.execute("anything").is_failed());
        assert!(session.state().is_idle());
        assert_eq!(sink.messages(), vec!["not good enough"]);
    }

    #[test]
    fn test_key_prompt_rejects_empty_input() {
        struct Menu {
            prompt: Arc<KeyPrompt>,
            confirmed: AtomicUsize,
        }

        impl Command for Menu {
            fn name(&self) -> &str {
                "menu"
            }

            fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
                if ctx.is_prompt(&self.prompt) && self.prompt.key() == NavigationKey::Confirm {
                    self.confirmed.fetch_add(1, Ordering::SeqCst);
                    return Ok(CommandOutput::None);
                }
                Ok(CommandOutput::prompt(self.prompt.clone()))
            }
        }

        let menu = Arc::new(Menu {
            prompt: Arc::new(KeyPrompt::new()),
            confirmed: AtomicUsize::new(0),
        });
        let mut registry = CommandRegistry::new();
        registry.add_shared(menu.clone());
        let (mut session, sink) = session(registry);

        session.execute("menu");
        assert!(matches!(session.execute(""), Execution::Rejected));
        assert!(session.is_busy());

        assert!(matches!(session.execute("down"), Execution::Prompt(_)));
        assert!(session.is_busy());

        assert!(matches!(session.execute("Enter"), Execution::Nothing));
        assert!(session.state().is_idle());
        assert_eq!(menu.confirmed.load(Ordering::SeqCst), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_reparsing_prompt_retokenizes_input() {
        struct Sum {
            prompt: Arc<LinePrompt>,
        }

        impl Command for Sum {
            fn name(&self) -> &str {
                "sum"
            }

            fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
                if !ctx.is_prompt(&self.prompt) {
                    return Ok(CommandOutput::prompt(self.prompt.clone()));
                }
                let mut total = 0_i64;
                for token in ctx.arguments() {
                    total += token.value::<i64>()?;
                }
                Ok(CommandOutput::Value(Value::I64(total)))
            }
        }

        let mut registry = CommandRegistry::new();
        registry.add_command(Sum {
            prompt: Arc::new(LinePrompt),
        });
        let (mut session, _sink) = session(registry);

        session.execute("sum");
        let execution = session.execute("1 2 39");
        assert_eq!(execution.value(), Some(&Value::I64(42)));
    }

    #[test]
    fn test_panicking_command_is_contained() {
        let mut registry = CommandRegistry::new();
        registry.add_target(CommandTarget::function("explode", || -> i32 {
            panic!("boom")
        }));
        let (mut session, sink) = session(registry);

        assert!(session.execute("explode").is_failed());
        assert_eq!(
            sink.messages(),
            vec!["There was an error while executing command 'explode'."]
        );
    }

    #[test]
    fn test_execute_tokens() {
        let mut registry = CommandRegistry::new();
        registry.add_target(CommandTarget::function("neg", |a: i64| -a));
        let (mut session, _sink) = session(registry);

        let tokens = vec![
            ArgumentToken::literal("neg"),
            ArgumentToken::new("4", [Value::I64(4), Value::from("4")]),
        ];
        assert_eq!(session.execute_tokens(tokens).value(), Some(&Value::I64(-4)));
    }

    #[test]
    fn test_alias_is_reported_name() {
        let mut registry = CommandRegistry::new();
        registry.add_target(
            CommandTarget::function("fail", || -> Result<(), anyhow::Error> {
                Err(anyhow::anyhow!("nope"))
            })
            .alias("f"),
        );
        let (mut session, sink) = session(registry);
        session.execute("F");
        assert_eq!(
            sink.messages(),
            vec!["There was an error while executing command 'f'."]
        );
    }

    #[tokio::test]
    async fn test_async_command_completes_out_of_band() {
        let mut registry = CommandRegistry::new();
        registry.add_target(CommandTarget::function("later", || {
            CommandOutput::task(async { 9_u16 })
        }));
        let (mut session, sink) = session(registry);

        let Execution::Pending(handle) = session.execute("later") else {
            panic!("expected a pending task");
        };
        assert!(session.state().is_idle());
        assert_eq!(handle.await, Some(Value::U16(9)));
        assert_eq!(sink.messages(), vec!["Command returned '9'"]);
    }

    #[tokio::test]
    async fn test_execute_async_awaits_task() {
        let mut registry = CommandRegistry::new();
        registry.add_target(CommandTarget::function("later", || {
            CommandOutput::task(async { "done" })
        }));
        let (mut session, sink) = session(registry);

        let execution = session.execute_async("later").await;
        assert_eq!(execution.value(), Some(&Value::from("done")));
        assert_eq!(session.last_value(), Some(&Value::from("done")));
        assert_eq!(sink.messages(), vec!["Command returned 'done'"]);
    }
}
