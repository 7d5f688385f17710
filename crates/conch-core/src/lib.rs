//! # Conch Core
//!
//! The leaf data model of the Conch command console.
//!
//! This crate holds everything a command implementation touches without
//! needing the session itself:
//!
//! - **Values**: typed argument values and their runtime types ([`Value`], [`ValueType`])
//! - **Value parsers**: pluggable string to value converters ([`ValueParser`], [`ValueParserRegistry`])
//! - **Argument tokens**: raw text plus every candidate that parsed from it ([`ArgumentToken`])
//! - **Prompts**: multi-turn continuations ([`Prompt`], [`TextPrompt`], [`KeyPrompt`])
//! - **Console log**: entries and sinks for console output ([`LogEntry`], [`LogSink`], [`Logger`])
//! - **Errors and outputs**: what a command hands back to the session ([`CommandError`], [`CommandOutput`])
//!
//! ## Candidate model
//!
//! ```text
//!  "5"  ──▶ ValueParserRegistry ──▶ ArgumentToken { text: "5", candidates: [I32(5), U32(5), ..., String("5")] }
//! ```
//!
//! The overload resolver in `conch-framework` picks one candidate per token.
//!
//! ## Example
//!
//! ```rust,ignore
//! use conch_core::{ValueParserRegistry, ValueType};
//!
//! let parsers = ValueParserRegistry::standard();
//! let token = parsers.parse_token("5");
//! assert!(token.candidates().iter().any(|v| v.value_type() == ValueType::I32));
//! assert_eq!(token.value::<i32>().unwrap(), 5);
//! ```

pub mod argument;
pub mod error;
pub mod log;
pub mod output;
pub mod prompt;
pub mod value;

pub use argument::ArgumentToken;
pub use error::{CommandError, count_message};
pub use log::{
    BroadcastSink, FanoutSink, LogEntry, LogLevel, LogSink, Logger, MemorySink, TracingSink,
};
pub use output::{CommandOutput, CommandResult, CommandTask, IntoOutput};
pub use prompt::{
    InputMode, KeyPrompt, LinePrompt, NavigationKey, Prompt, PromptHandle, TextPrompt, same_prompt,
};
pub use value::parser::{BoolParser, FnParser, StdParser, StringParser, ValueParser, ValueParserRegistry};
pub use value::{ArgType, CustomType, CustomValue, Param, Value, ValueType};

/// Re-exported so that [`custom_value!`] expansions resolve in downstream crates.
pub use rust_decimal::Decimal;
