//! Outcome classification.
//!
//! Every command result, whether it comes straight out of a dispatch, out of
//! one instance of a fanned-out target, or out of an asynchronous task that
//! finished later, goes through [`Reporter::report`]. That keeps the logging
//! of return values and the rendering of errors identical on all paths.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use conch_core::{CommandError, CommandOutput, CommandResult, CommandTask, Logger, PromptHandle, Value};
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::settings::ConsoleConfig;

// ============================================================================
// Execution
// ============================================================================

/// What one console turn produced, after logging.
pub enum Execution {
    /// Empty input, or a command that returned nothing.
    Nothing,
    /// A returned value.
    Value(Value),
    /// The session now waits for input to this prompt.
    Prompt(PromptHandle),
    /// An asynchronous command is still running.
    Pending(TaskHandle),
    /// The pending prompt rejected the input; nothing changed.
    Rejected,
    /// The command failed; the error has been logged.
    Failed,
}

impl Execution {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => f.write_str("Nothing"),
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Prompt(_) => f.write_str("Prompt(..)"),
            Self::Pending(_) => f.write_str("Pending(..)"),
            Self::Rejected => f.write_str("Rejected"),
            Self::Failed => f.write_str("Failed"),
        }
    }
}

/// Completion of a spawned command task.
///
/// Resolves to the value the task returned, if any. Dropping the handle does
/// not cancel the task.
pub struct TaskHandle {
    receiver: oneshot::Receiver<Option<Value>>,
}

impl Future for TaskHandle {
    type Output = Option<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.ok().flatten())
    }
}

// ============================================================================
// TaskSpawner
// ============================================================================

/// Runs detached command tasks.
pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// Spawns on the ambient tokio runtime, or on a dedicated thread when there
/// is none.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSpawner;

impl TaskSpawner for TokioSpawner {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(task);
            }
            Err(_) => {
                debug!("no tokio runtime, running command task on a thread");
                std::thread::spawn(move || futures::executor::block_on(task));
            }
        }
    }
}

// ============================================================================
// Reporter
// ============================================================================

/// Runs a command body, turning a panic into an undeclared error.
pub fn catch_panic<F>(body: F) -> CommandResult
where
    F: FnOnce() -> CommandResult,
{
    std::panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|payload| {
        warn!("command body panicked");
        Err(CommandError::from_panic(payload))
    })
}

/// Logs command outcomes according to the console configuration.
#[derive(Clone)]
pub struct Reporter {
    logger: Logger,
    config: Arc<ConsoleConfig>,
    spawner: Arc<dyn TaskSpawner>,
}

impl Reporter {
    pub fn new(logger: Logger, config: Arc<ConsoleConfig>, spawner: Arc<dyn TaskSpawner>) -> Self {
        Self {
            logger,
            config,
            spawner,
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Classifies one result.
    ///
    /// Prompts are handed back untouched; installing them is up to the
    /// caller. Tasks are spawned and reported when they finish.
    pub fn report(&self, command: &str, result: CommandResult) -> Execution {
        match result {
            Ok(CommandOutput::None) => Execution::Nothing,
            Ok(CommandOutput::Value(value)) => {
                if self.config.log_return_values {
                    self.logger.info(format!("Command returned '{value}'"));
                }
                Execution::Value(value)
            }
            Ok(CommandOutput::Prompt(prompt)) => Execution::Prompt(prompt),
            Ok(CommandOutput::Task(task)) => Execution::Pending(self.spawn(command, task)),
            Err(err) => {
                self.report_error(command, &err);
                if err.is_silent() {
                    Execution::Rejected
                } else {
                    Execution::Failed
                }
            }
        }
    }

    /// Logs `error` once at error level, unless it is silent.
    pub fn report_error(&self, command: &str, error: &CommandError) {
        if let Some(message) = self.render_error(command, error) {
            debug!(command, declared = error.is_declared(), "command failed");
            self.logger.error(message);
        }
    }

    /// The console message for `error`, or `None` for silent errors.
    pub fn render_error(&self, command: &str, error: &CommandError) -> Option<String> {
        match error {
            CommandError::PromptRejected => None,
            CommandError::Command { message, trace } => {
                let captured = trace.status() == std::backtrace::BacktraceStatus::Captured;
                if self.config.include_stack_trace_in_command_errors && captured {
                    Some(format!("{message}\n{trace}"))
                } else {
                    Some(message.clone())
                }
            }
            e if e.is_declared() => Some(e.to_string()),
            e => Some(if self.config.include_details_in_unexpected_errors {
                format!("There was an error while executing command '{command}': {e:#}")
            } else {
                format!("There was an error while executing command '{command}'.")
            }),
        }
    }

    /// Spawns `task`; its outcome is reported when it finishes.
    pub fn spawn(&self, command: &str, task: CommandTask) -> TaskHandle {
        let (sender, receiver) = oneshot::channel();
        let reporter = self.clone();
        let command = command.to_string();
        self.spawner.spawn(Box::pin(async move {
            let execution = reporter.complete(&command, task).await;
            let _ = sender.send(execution.into_value());
        }));
        TaskHandle { receiver }
    }

    /// Awaits `task` and reports its outcome.
    ///
    /// A task may resolve to another task, which is awaited in turn. A prompt
    /// returned from a task is not logged and does not become pending.
    pub async fn complete(&self, command: &str, task: CommandTask) -> Execution {
        let mut task = task;
        loop {
            let result = AssertUnwindSafe(task)
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(CommandError::from_panic(payload)));
            match result {
                Ok(CommandOutput::Task(next)) => task = next,
                Ok(CommandOutput::Prompt(prompt)) => {
                    debug!(command, "discarding prompt returned from a command task");
                    return Execution::Prompt(prompt);
                }
                other => return self.report(command, other),
            }
        }
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conch_core::{LogLevel, MemorySink};

    async fn fail_later() -> CommandResult {
        Err(CommandError::command("late failure"))
    }

    async fn ready_true() -> CommandResult {
        Ok(CommandOutput::Value(Value::Bool(true)))
    }

    async fn explode_later() -> CommandResult {
        panic!("async kaboom")
    }

    fn recording(config: ConsoleConfig) -> (Reporter, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let reporter = Reporter::new(
            Logger::new(sink.clone()),
            Arc::new(config),
            Arc::new(TokioSpawner),
        );
        (reporter, sink)
    }

    #[test]
    fn test_value_is_logged() {
        let (reporter, sink) = recording(ConsoleConfig::default());
        let execution = reporter.report("add", Ok(CommandOutput::Value(Value::I32(3))));
        assert_eq!(execution.value(), Some(&Value::I32(3)));
        assert_eq!(sink.messages(), vec!["Command returned '3'"]);
    }

    #[test]
    fn test_value_logging_can_be_disabled() {
        let config = ConsoleConfig {
            log_return_values: false,
            ..ConsoleConfig::default()
        };
        let (reporter, sink) = recording(config);
        reporter.report("add", Ok(CommandOutput::Value(Value::I32(3))));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_unexpected_error_rendering() {
        let (reporter, sink) = recording(ConsoleConfig::default());
        let execution = reporter.report("boom", Err(anyhow::anyhow!("disk full").into()));
        assert!(execution.is_failed());
        assert_eq!(
            sink.messages(),
            vec!["There was an error while executing command 'boom'."]
        );
        assert_eq!(sink.entries()[0].level, LogLevel::Error);

        let config = ConsoleConfig {
            include_details_in_unexpected_errors: true,
            ..ConsoleConfig::default()
        };
        let (reporter, sink) = recording(config);
        reporter.report("boom", Err(anyhow::anyhow!("disk full").into()));
        assert_eq!(
            sink.messages(),
            vec!["There was an error while executing command 'boom': disk full"]
        );
    }

    #[test]
    fn test_declared_error_rendering() {
        let config = ConsoleConfig {
            include_stack_trace_in_command_errors: false,
            ..ConsoleConfig::default()
        };
        let (reporter, sink) = recording(config);
        reporter.report("heal", Err(CommandError::command("Target is dead")));
        reporter.report("heal", Err(CommandError::not_found("heal")));
        assert_eq!(
            sink.messages(),
            vec!["Target is dead", "Command heal doesn't exist"]
        );
    }

    #[test]
    fn test_prompt_rejection_is_silent() {
        let (reporter, sink) = recording(ConsoleConfig::default());
        let execution = reporter.report("x", Err(CommandError::PromptRejected));
        assert!(matches!(execution, Execution::Rejected));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_catch_panic() {
        let result = catch_panic(|| panic!("kaboom"));
        match result {
            Err(CommandError::Panicked(message)) => assert_eq!(message, "kaboom"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_spawned_task_reports_on_completion() {
        let (reporter, sink) = recording(ConsoleConfig::default());
        let output = CommandOutput::task(async { 7_i64 });
        let Execution::Pending(handle) = reporter.report("later", Ok(output)) else {
            panic!("expected a pending task");
        };
        assert_eq!(handle.await, Some(Value::I64(7)));
        assert_eq!(sink.messages(), vec!["Command returned '7'"]);
    }

    #[tokio::test]
    async fn test_task_failure_uses_same_classification() {
        let config = ConsoleConfig {
            include_stack_trace_in_command_errors: false,
            ..ConsoleConfig::default()
        };
        let (reporter, sink) = recording(config);
        let execution = reporter.complete("later", Box::pin(fail_later())).await;
        assert!(execution.is_failed());
        assert_eq!(sink.messages(), vec!["late failure"]);
    }

    #[tokio::test]
    async fn test_task_panic_is_caught() {
        let (reporter, sink) = recording(ConsoleConfig::default());
        let execution = reporter.complete("later", Box::pin(explode_later())).await;
        assert!(execution.is_failed());
        assert_eq!(
            sink.messages(),
            vec!["There was an error while executing command 'later'."]
        );
    }

    #[test]
    fn test_spawn_without_runtime_uses_thread() {
        let (reporter, sink) = recording(ConsoleConfig::default());
        let handle = reporter.spawn("later", Box::pin(ready_true()));
        assert_eq!(futures::executor::block_on(handle), Some(Value::Bool(true)));
        assert_eq!(sink.messages(), vec!["Command returned 'true'"]);
    }
}
