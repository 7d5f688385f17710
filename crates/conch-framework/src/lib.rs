//! # Conch Framework
//!
//! Command registry, overload resolution and the console session.
//!
//! This layer provides:
//! - [`Command`] and [`CommandTarget`], the two ways to define a command
//! - [`CommandRegistry`] with link-time registration through [`COMMAND_REGISTRATIONS`]
//! - [`OverloadResolver`], which picks a target and a typed value per argument
//! - [`ConsoleSession`], the line-in / outcome-out state machine with prompts
//! - [`Reporter`], which turns results into console log entries
//! - Built-in commands (with the `builtin-commands` feature)
//!
//! The session has no I/O of its own; `conch-runtime` drives it from an input
//! source and wires its log sinks.
//!
//! ## Example
//!
//! ```rust,ignore
//! use conch_framework::{CommandRegistry, CommandTarget, ConsoleSession};
//!
//! let mut registry = CommandRegistry::new();
//! registry.add_target(CommandTarget::function("add", |a: i32, b: i32| a + b));
//!
//! let mut session = ConsoleSession::new(registry);
//! assert_eq!(session.execute("add 2 3").into_value(), Some(5.into()));
//! ```

pub mod command;
pub mod context;
pub mod instance;
pub mod parser;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod session;
pub mod settings;
pub mod target;

#[cfg(feature = "builtin-commands")]
pub mod builtin;

pub use linkme;

pub use command::{AttributeCommand, Command, CommandHandle};
pub use context::{CommandContext, ConsoleView};
pub use instance::{Instance, TargetInstances};
pub use parser::{LineParser, ShellLineParser, shell_split};
pub use registry::{COMMAND_REGISTRATIONS, CommandRegistry, RegistryEvent};
pub use report::{Execution, Reporter, TaskHandle, TaskSpawner, TokioSpawner, catch_panic};
pub use resolver::{OverloadResolver, Resolution};
pub use session::{ConsoleSession, ConsoleSessionBuilder, SessionState};
pub use settings::{AppInfo, ConsoleConfig};
pub use target::{Arguments, CommandTarget, Owner, TargetKind};

#[cfg(feature = "builtin-commands")]
pub use builtin::register_builtins;
