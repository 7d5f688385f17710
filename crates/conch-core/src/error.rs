//! Command error taxonomy.
//!
//! Errors split into two families that the console renders differently:
//!
//! - **Declared** errors are part of a command's contract: lookup failures,
//!   argument count and parse failures, and [`CommandError::Command`] raised
//!   deliberately by a command body. Their message is shown as-is.
//! - **Undeclared** faults are everything else: an `anyhow::Error` bubbling
//!   out of a body, or a panic caught at the dispatch boundary. Their detail
//!   is shown only when the console is configured to.
//!
//! [`CommandError::PromptRejected`] belongs to neither; the console drops it
//! without logging.

use std::any::Any;
use std::backtrace::Backtrace;
use std::sync::Arc;

use thiserror::Error;

use crate::value::ValueType;

/// Errors produced while resolving or running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command {name} doesn't exist")]
    CommandNotFound { name: String },

    #[error("{}", count_message(*supplied, *min, *max))]
    ArgumentCountMismatch {
        supplied: usize,
        min: usize,
        max: usize,
    },

    #[error("Unable to parse '{literal}' to {expected}")]
    ArgumentParseFailure { expected: ValueType, literal: String },

    #[error("Input was rejected by the pending prompt")]
    PromptRejected,

    /// A failure a command body raised on purpose.
    #[error("{message}")]
    Command {
        message: String,
        trace: Arc<Backtrace>,
    },

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),

    #[error("command panicked: {0}")]
    Panicked(String),
}

/// Message for an argument count outside `min..=max`.
pub fn count_message(supplied: usize, min: usize, max: usize) -> &'static str {
    if supplied < min {
        "Not enough arguments"
    } else if supplied > max {
        "Too many arguments"
    } else {
        "Invalid argument count"
    }
}

impl CommandError {
    /// A declared command error. Captures a backtrace when `RUST_BACKTRACE`
    /// or `RUST_LIB_BACKTRACE` enables it.
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
            trace: Arc::new(Backtrace::capture()),
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::CommandNotFound { name: name.into() }
    }

    /// Classifies a payload caught by `catch_unwind`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_owned()
        };
        Self::Panicked(message)
    }

    /// Whether this error is part of a command's declared contract.
    pub fn is_declared(&self) -> bool {
        matches!(
            self,
            Self::CommandNotFound { .. }
                | Self::ArgumentCountMismatch { .. }
                | Self::ArgumentParseFailure { .. }
                | Self::Command { .. }
        )
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, Self::PromptRejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_messages() {
        let err = CommandError::ArgumentCountMismatch {
            supplied: 0,
            min: 1,
            max: 2,
        };
        assert_eq!(err.to_string(), "Not enough arguments");
        assert_eq!(count_message(3, 1, 2), "Too many arguments");
        assert_eq!(count_message(1, 1, 2), "Invalid argument count");
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            CommandError::not_found("frobnicate").to_string(),
            "Command frobnicate doesn't exist"
        );
    }

    #[test]
    fn test_classification() {
        assert!(CommandError::command("nope").is_declared());
        assert!(!CommandError::from(anyhow::anyhow!("boom")).is_declared());
        assert!(!CommandError::Panicked("boom".into()).is_declared());
        assert!(CommandError::PromptRejected.is_silent());
    }

    #[test]
    fn test_from_panic_payloads() {
        let err = CommandError::from_panic(Box::new("static"));
        assert_eq!(err.to_string(), "command panicked: static");
        let err = CommandError::from_panic(Box::new(String::from("owned")));
        assert_eq!(err.to_string(), "command panicked: owned");
        let err = CommandError::from_panic(Box::new(7_u8));
        assert_eq!(err.to_string(), "command panicked: unknown panic payload");
    }
}
