use conch_core::{CommandError, CommandOutput, CommandResult, LogEntry};

use crate::command::Command;
use crate::context::CommandContext;

/// `help [page | command]`
///
/// Without an argument, lists the first page of commands. An integer argument
/// selects a page; anything else is looked up as a command name.
pub struct Help {
    pub multiple_pages: bool,
    pub allow_detailed_description: bool,
    pub page_command_limit: usize,
}

impl Default for Help {
    fn default() -> Self {
        Self {
            multiple_pages: true,
            allow_detailed_description: true,
            page_command_limit: 16,
        }
    }
}

impl Help {
    fn describe_command(&self, ctx: &CommandContext<'_>, target: &str) -> CommandResult {
        let Some(command) = ctx.console().registry().get(target) else {
            return Err(CommandError::command(format!(
                "Command '{target}' does not exist!"
            )));
        };

        match command.detailed_description().or_else(|| command.description()) {
            Some(text) => ctx.logger().log(
                LogEntry::info(format!("Help for command '{}': {text}", command.name()))
                    .with_color_tag("info"),
            ),
            None => ctx
                .logger()
                .info(format!("No detailed help available for command '{target}'")),
        }
        Ok(CommandOutput::None)
    }

    fn list_page(&self, ctx: &CommandContext<'_>, page: usize) -> CommandResult {
        let registry = ctx.console().registry();
        let limit = self.page_command_limit.max(1);
        let start = page.saturating_mul(limit);
        if start >= registry.len() {
            return Err(CommandError::command("Page index out of range"));
        }

        let mut text = if self.multiple_pages {
            format!("List of available commands, page: {page}")
        } else {
            "List of available commands".to_string()
        };
        let take = if self.multiple_pages { limit } else { usize::MAX };
        for command in registry.iter().skip(start).take(take) {
            let description = command
                .description()
                .unwrap_or_else(|| "No description".to_string());
            text.push('\n');
            text.push_str(&format!("{} - {description}", command.name()));
        }

        ctx.logger().log(LogEntry::info(text).with_color_tag("info"));
        Ok(CommandOutput::None)
    }
}

impl Command for Help {
    fn name(&self) -> &str {
        "help"
    }

    fn description(&self) -> Option<String> {
        Some("Displays a list of all available commands.".into())
    }

    fn detailed_description(&self) -> Option<String> {
        Some("help - first page of commands\nhelp <page> - a page of commands\nhelp <command> - help for one command".into())
    }

    fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let max = usize::from(self.multiple_pages || self.allow_detailed_description);
        ctx.check_argument_count(0, max)?;

        let Some(argument) = ctx.argument(0) else {
            return self.list_page(ctx, 0);
        };

        match argument.try_value::<i32>() {
            Some(page) if self.multiple_pages => {
                let page = usize::try_from(page)
                    .map_err(|_| CommandError::command("Page index out of range"))?;
                self.list_page(ctx, page)
            }
            _ if self.allow_detailed_description => {
                let target = argument.text().to_string();
                self.describe_command(ctx, &target)
            }
            _ => Err(CommandError::ArgumentCountMismatch {
                supplied: 1,
                min: 0,
                max: 0,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::builtin::tests::session;
    use crate::registry::CommandRegistry;
    use crate::session::ConsoleSession;
    use crate::target::CommandTarget;
    use conch_core::MemorySink;

    #[test]
    fn test_first_page_lists_commands() {
        let (mut session, sink) = session();
        session.execute("help");
        let text = &sink.messages()[0];
        assert!(text.starts_with("List of available commands, page: 0"));
        assert!(text.contains("clear - Clears the console."));
        assert!(text.contains("version - Displays current project version."));
    }

    #[test]
    fn test_pages_are_bounded() {
        let sink = Arc::new(MemorySink::default());
        let mut registry = CommandRegistry::new();
        for i in 0..5 {
            registry.add_target(CommandTarget::function(format!("cmd{i}"), || ()));
        }
        registry.add_command(Help {
            page_command_limit: 2,
            ..Help::default()
        });
        let config = crate::settings::ConsoleConfig {
            include_stack_trace_in_command_errors: false,
            ..Default::default()
        };
        let mut session = ConsoleSession::builder()
            .registry(registry)
            .sink(sink.clone())
            .config(config)
            .build();

        session.execute("help 1");
        assert_eq!(
            sink.messages()[0],
            "List of available commands, page: 1\ncmd2 - No description\ncmd3 - No description"
        );

        sink.clear();
        session.execute("help 3");
        assert_eq!(sink.messages(), vec!["Page index out of range"]);
    }

    #[test]
    fn test_command_detail() {
        let (mut session, sink) = session();
        session.execute("help echo");
        assert_eq!(sink.messages(), vec!["Help for command 'echo': Logs a message."]);
    }

    #[test]
    fn test_unknown_command_detail() {
        let (mut session, sink) = session();
        assert!(session.execute("help nothing").is_failed());
        assert!(sink.messages()[0].starts_with("Command 'nothing' does not exist!"));
    }
}
