//! What a command body hands back to the console.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::CommandError;
use crate::prompt::{Prompt, PromptHandle};
use crate::value::Value;

/// An asynchronous continuation of a command.
pub type CommandTask = BoxFuture<'static, CommandResult>;

pub type CommandResult = Result<CommandOutput, CommandError>;

/// Successful outcome of running a command.
pub enum CommandOutput {
    /// Nothing to report.
    None,
    /// A value; the console logs it as `Command returned '<value>'`.
    Value(Value),
    /// Keep the command active and route the next input line to this prompt.
    Prompt(PromptHandle),
    /// Work that completes later. The console does not block on it.
    Task(CommandTask),
}

impl CommandOutput {
    /// Wraps a future as a [`CommandOutput::Task`].
    pub fn task<F, T>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
        T: IntoOutput,
    {
        Self::Task(Box::pin(async move { future.await.into_output() }))
    }

    pub fn prompt<P: Prompt>(prompt: Arc<P>) -> Self {
        Self::Prompt(prompt)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Debug for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Prompt(_) => f.write_str("Prompt(..)"),
            Self::Task(_) => f.write_str("Task(..)"),
        }
    }
}

// ============================================================================
// IntoOutput
// ============================================================================

/// Conversion from a command body's return type.
pub trait IntoOutput {
    fn into_output(self) -> CommandResult;
}

impl IntoOutput for () {
    fn into_output(self) -> CommandResult {
        Ok(CommandOutput::None)
    }
}

impl IntoOutput for CommandOutput {
    fn into_output(self) -> CommandResult {
        Ok(self)
    }
}

impl IntoOutput for PromptHandle {
    fn into_output(self) -> CommandResult {
        Ok(CommandOutput::Prompt(self))
    }
}

impl IntoOutput for &str {
    fn into_output(self) -> CommandResult {
        Ok(CommandOutput::Value(Value::String(self.to_owned())))
    }
}

impl<T: IntoOutput> IntoOutput for Option<T> {
    fn into_output(self) -> CommandResult {
        match self {
            Some(inner) => inner.into_output(),
            None => Ok(CommandOutput::None),
        }
    }
}

impl<T, E> IntoOutput for Result<T, E>
where
    T: IntoOutput,
    E: Into<CommandError>,
{
    fn into_output(self) -> CommandResult {
        match self {
            Ok(inner) => inner.into_output(),
            Err(err) => Err(err.into()),
        }
    }
}
