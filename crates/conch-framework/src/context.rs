//! Invocation context handed to command bodies.
//!
//! A [`CommandContext`] lives for exactly one dispatch. It carries what the
//! user typed, the tokens the command runs against and the prompt that
//! produced them (if any), plus a [`ConsoleView`] onto the session: the
//! registry, the live target instances, the console logger and settings.
//!
//! Token 0 is always the command name; prompt turns get a synthetic name
//! token so argument positions are the same on every turn.

use std::sync::Arc;

use conch_core::{ArgumentToken, CommandError, Logger, Prompt, PromptHandle, same_prompt};
use tokio_util::sync::CancellationToken;

use crate::instance::TargetInstances;
use crate::registry::CommandRegistry;
use crate::report::Reporter;
use crate::settings::{AppInfo, ConsoleConfig};

/// Read access to the session that is running a command.
#[derive(Clone, Copy)]
pub struct ConsoleView<'a> {
    pub(crate) registry: &'a CommandRegistry,
    pub(crate) instances: &'a TargetInstances,
    pub(crate) reporter: &'a Reporter,
    pub(crate) app: &'a AppInfo,
    pub(crate) shutdown: &'a CancellationToken,
}

impl<'a> ConsoleView<'a> {
    pub fn registry(&self) -> &'a CommandRegistry {
        self.registry
    }

    pub fn instances(&self) -> &'a TargetInstances {
        self.instances
    }

    pub fn reporter(&self) -> &'a Reporter {
        self.reporter
    }

    pub fn logger(&self) -> &'a Logger {
        self.reporter.logger()
    }

    pub fn config(&self) -> &'a ConsoleConfig {
        self.reporter.config()
    }

    pub fn app(&self) -> &'a AppInfo {
        self.app
    }

    /// Cancelled when the console is asked to shut down.
    pub fn shutdown(&self) -> &'a CancellationToken {
        self.shutdown
    }
}

/// Per-dispatch state passed to [`Command::run`](crate::Command::run).
pub struct CommandContext<'a> {
    raw_input: &'a str,
    command_name: &'a str,
    tokens: Vec<ArgumentToken>,
    prompt: Option<PromptHandle>,
    console: ConsoleView<'a>,
}

impl<'a> CommandContext<'a> {
    pub(crate) fn new(
        raw_input: &'a str,
        command_name: &'a str,
        tokens: Vec<ArgumentToken>,
        prompt: Option<PromptHandle>,
        console: ConsoleView<'a>,
    ) -> Self {
        Self {
            raw_input,
            command_name,
            tokens,
            prompt,
            console,
        }
    }

    /// The input line exactly as typed.
    pub fn raw_input(&self) -> &'a str {
        self.raw_input
    }

    /// Lower-cased name or alias the command was invoked with.
    pub fn command_name(&self) -> &'a str {
        self.command_name
    }

    /// All tokens, command name first.
    pub fn tokens(&self) -> &[ArgumentToken] {
        &self.tokens
    }

    /// Tokens after the command name.
    pub fn arguments(&self) -> &[ArgumentToken] {
        self.tokens.get(1..).unwrap_or_default()
    }

    pub fn arguments_mut(&mut self) -> &mut [ArgumentToken] {
        self.tokens.get_mut(1..).unwrap_or_default()
    }

    /// The argument at `index`, counting from 0 after the command name.
    pub fn argument(&self, index: usize) -> Option<&ArgumentToken> {
        self.arguments().get(index)
    }

    pub fn argument_count(&self) -> usize {
        self.arguments().len()
    }

    /// Fails with [`CommandError::ArgumentCountMismatch`] unless the argument
    /// count is within `min..=max`.
    pub fn check_argument_count(&self, min: usize, max: usize) -> Result<(), CommandError> {
        let supplied = self.argument_count();
        if supplied < min || supplied > max {
            return Err(CommandError::ArgumentCountMismatch { supplied, min, max });
        }
        Ok(())
    }

    /// The prompt whose input produced these tokens.
    pub fn prompt(&self) -> Option<&PromptHandle> {
        self.prompt.as_ref()
    }

    /// Whether this turn is the answer to `prompt`.
    pub fn is_prompt<P: Prompt>(&self, prompt: &Arc<P>) -> bool {
        self.prompt
            .as_ref()
            .is_some_and(|active| same_prompt(active, prompt))
    }

    pub fn console(&self) -> ConsoleView<'a> {
        self.console
    }

    pub fn logger(&self) -> &'a Logger {
        self.console.logger()
    }
}

impl std::fmt::Debug for CommandContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("raw_input", &self.raw_input)
            .field("command_name", &self.command_name)
            .field("tokens", &self.tokens)
            .field("prompt", &self.prompt.is_some())
            .finish_non_exhaustive()
    }
}
