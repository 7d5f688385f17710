use conch_core::{CommandOutput, CommandResult};

use crate::command::Command;
use crate::context::CommandContext;

/// Logs the [`AppInfo`](crate::settings::AppInfo) the console was built with.
pub struct Version;

impl Command for Version {
    fn name(&self) -> &str {
        "version"
    }

    fn aliases(&self) -> Vec<String> {
        vec!["info".into(), "about".into()]
    }

    fn description(&self) -> Option<String> {
        Some("Displays current project version.".into())
    }

    fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        ctx.check_argument_count(0, 0)?;
        match ctx.console().app().describe() {
            Some(text) => ctx.logger().info(text),
            None => ctx.logger().error("No version information is supplied."),
        }
        Ok(CommandOutput::None)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use conch_core::{LogLevel, MemorySink};

    use super::*;
    use crate::builtin::tests::session;
    use crate::registry::CommandRegistry;
    use crate::session::ConsoleSession;
    use crate::settings::AppInfo;

    #[test]
    fn test_missing_app_info() {
        let (mut session, sink) = session();
        session.execute("about");
        let entry = &sink.entries()[0];
        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.message, "No version information is supplied.");
    }

    #[test]
    fn test_app_info_is_described() {
        let sink = Arc::new(MemorySink::default());
        let mut registry = CommandRegistry::new();
        registry.add_command(Version);
        let mut session = ConsoleSession::builder()
            .registry(registry)
            .sink(sink.clone())
            .app(AppInfo {
                project_name: Some("demo".into()),
                version: Some("1.2.0".into()),
                engine: Some("conch".into()),
                engine_version: Some("0.1.0".into()),
            })
            .build();

        session.execute("version");
        assert_eq!(sink.messages(), vec!["demo v1.2.0, made with conch v0.1.0"]);
    }
}
