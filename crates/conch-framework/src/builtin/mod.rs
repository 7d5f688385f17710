//! Built-in console commands.
//!
//! Enabled by the `builtin-commands` feature (on by default).
//!
//! | command | aliases | description |
//! |---------|---------|-------------|
//! | `clear` | `cls`, `clr` | Clears the console |
//! | `echo` | `print` | Logs its argument |
//! | `exit` | `quit` | Cancels the console's shutdown token |
//! | `helloworld` | `hello` | Logs a greeting |
//! | [`Help`] | | Paged command list, or help for one command |
//! | [`Version`] | `info`, `about` | Shows the application version |
//!
//! # Loading built-in commands
//!
//! ```rust,ignore
//! let mut registry = CommandRegistry::collect_registered();
//! conch_framework::builtin::register_builtins(&mut registry);
//! ```

mod help;
mod version;

pub use help::Help;
pub use version::Version;

use conch_core::{CommandOutput, CommandResult, LogEntry};

use crate::command::{Command, CommandHandle};
use crate::context::CommandContext;
use crate::registry::CommandRegistry;

/// Adds every built-in command.
pub fn register_builtins(registry: &mut CommandRegistry) {
    registry.add_commands(builtins());
}

/// Fresh instances of every built-in command.
pub fn builtins() -> Vec<CommandHandle> {
    vec![
        std::sync::Arc::new(Clear),
        std::sync::Arc::new(Echo),
        std::sync::Arc::new(Exit),
        std::sync::Arc::new(HelloWorld),
        std::sync::Arc::new(Help::default()),
        std::sync::Arc::new(Version),
    ]
}

pub struct Clear;

impl Command for Clear {
    fn name(&self) -> &str {
        "clear"
    }

    fn aliases(&self) -> Vec<String> {
        vec!["cls".into(), "clr".into()]
    }

    fn description(&self) -> Option<String> {
        Some("Clears the console.".into())
    }

    fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        ctx.check_argument_count(0, 0)?;
        ctx.logger().clear();
        Ok(CommandOutput::None)
    }
}

pub struct Echo;

impl Command for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn aliases(&self) -> Vec<String> {
        vec!["print".into()]
    }

    fn description(&self) -> Option<String> {
        Some("Logs a message.".into())
    }

    fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        ctx.check_argument_count(1, 1)?;
        let message = ctx.argument(0).map(|t| t.text().to_string()).unwrap_or_default();
        ctx.logger().info(message);
        Ok(CommandOutput::None)
    }
}

pub struct Exit;

impl Command for Exit {
    fn name(&self) -> &str {
        "exit"
    }

    fn aliases(&self) -> Vec<String> {
        vec!["quit".into()]
    }

    fn description(&self) -> Option<String> {
        Some("Closes the console.".into())
    }

    fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        ctx.check_argument_count(0, 0)?;
        ctx.logger().info("Goodbye");
        ctx.console().shutdown().cancel();
        Ok(CommandOutput::None)
    }
}

pub struct HelloWorld;

impl Command for HelloWorld {
    fn name(&self) -> &str {
        "helloworld"
    }

    fn aliases(&self) -> Vec<String> {
        vec!["hello".into()]
    }

    fn description(&self) -> Option<String> {
        Some("Hello world!".into())
    }

    fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        ctx.check_argument_count(0, 0)?;
        ctx.logger()
            .log(LogEntry::info("Hello world :)").with_color_tag("green"));
        Ok(CommandOutput::None)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use conch_core::{LogLevel, MemorySink};

    use super::*;
    use crate::report::Execution;
    use crate::session::ConsoleSession;
    use crate::settings::ConsoleConfig;

    pub(super) fn session() -> (ConsoleSession, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let mut registry = CommandRegistry::new();
        register_builtins(&mut registry);
        let session = ConsoleSession::builder()
            .registry(registry)
            .sink(sink.clone())
            .config(ConsoleConfig {
                include_stack_trace_in_command_errors: false,
                ..ConsoleConfig::default()
            })
            .build();
        (session, sink)
    }

    #[test]
    fn test_clear_logs_clear_entry() {
        let (mut session, sink) = session();
        session.execute("cls");
        assert_eq!(sink.entries()[0].level, LogLevel::Clear);
    }

    #[test]
    fn test_clear_rejects_arguments() {
        let (mut session, sink) = session();
        assert!(session.execute("clear extra").is_failed());
        assert_eq!(sink.messages(), vec!["Too many arguments"]);
    }

    #[test]
    fn test_echo() {
        let (mut session, sink) = session();
        session.execute("print \"two words\"");
        assert_eq!(sink.messages(), vec!["two words"]);
        assert!(session.execute("echo").is_failed());
    }

    #[test]
    fn test_exit_cancels_shutdown_token() {
        let (mut session, sink) = session();
        let token = session.shutdown_token();
        assert!(matches!(session.execute("quit"), Execution::Nothing));
        assert!(token.is_cancelled());
        assert_eq!(sink.messages(), vec!["Goodbye"]);
    }

    #[test]
    fn test_hello() {
        let (mut session, sink) = session();
        session.execute("hello");
        let entry = &sink.entries()[0];
        assert_eq!(entry.message, "Hello world :)");
        assert_eq!(entry.color_tag.as_deref(), Some("green"));
    }
}
