//! # Conch
//!
//! An embeddable interactive command console.
//!
//! ## Overview
//!
//! Commands are ordinary Rust functions, methods or gettable/settable
//! values registered under a name. Each input line is split into tokens,
//! every token is parsed into all the typed values it can represent, and an
//! overload resolver picks the target and the argument types.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────────┐   ┌──────────────┐
//! │ InputSource  │──▶│ LineParser   │──▶│ OverloadResolver  │──▶│ CommandTarget│
//! │ (stdin, ...) │   │ + ValueParser│   │ (typed candidates)│   │  invoke      │
//! └──────────────┘   └──────────────┘   └───────────────────┘   └──────┬───────┘
//!                                                                      ▼
//!                      LogSink ◀── Reporter ◀── value / prompt / task / error
//! ```
//!
//! - **conch-core**: values, value parsers, argument tokens, prompts, console log
//! - **conch-framework**: targets, resolver, registry, session, built-in commands
//! - **conch-runtime**: configuration, tracing setup, the interactive loop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use conch::prelude::*;
//!
//! #[distributed_slice(COMMAND_REGISTRATIONS)]
//! #[linkme(crate = conch::linkme)]
//! static REGISTER: fn(&mut CommandRegistry) = register;
//!
//! fn register(registry: &mut CommandRegistry) {
//!     registry.add_target(
//!         CommandTarget::function("add", |a: i32, b: Option<i32>| a + b.unwrap_or(1))
//!             .description("Adds two numbers"),
//!     );
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = ConsoleRuntime::builder().build()?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `builtin-commands`: `help`, `echo`, `clear`, `exit`, `helloworld`, `version` (default)
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON tracing output

pub use conch_core as core;
pub use conch_framework as framework;
pub use conch_framework::linkme;
pub use conch_runtime as runtime;

/// Commonly used types for defining commands and running a console.
///
/// ```rust,ignore
/// use conch::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use conch_runtime::{ConchConfig, ConsoleRuntime, InputSource, ScriptSource};

    // Defining commands
    pub use conch_framework::{
        COMMAND_REGISTRATIONS, Command, CommandContext, CommandRegistry, CommandTarget,
        ConsoleSession, Execution, TargetInstances,
    };
    pub use conch_framework::linkme::distributed_slice;

    // Values, prompts and outputs
    pub use conch_core::{
        ArgumentToken, CommandError, CommandOutput, CommandResult, KeyPrompt, LinePrompt,
        LogEntry, NavigationKey, Prompt, TextPrompt, Value, ValueType,
    };
}
