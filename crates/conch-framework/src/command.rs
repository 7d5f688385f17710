//! The command abstraction.
//!
//! Every entry in the registry implements [`Command`]. Hand-written commands
//! implement it directly and read their arguments from the context;
//! [`AttributeCommand`] implements it for a set of [`CommandTarget`]s that
//! share a name, running the overload resolver on each dispatch.
//!
//! # Example
//!
//! ```rust,ignore
//! struct Shout;
//!
//! impl Command for Shout {
//!     fn name(&self) -> &str {
//!         "shout"
//!     }
//!
//!     fn description(&self) -> Option<String> {
//!         Some("Repeats a word in capitals".into())
//!     }
//!
//!     fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
//!         ctx.check_argument_count(1, 2)?;
//!         let word = ctx.argument(0).map(|t| t.text().to_uppercase()).unwrap_or_default();
//!         let times = match ctx.argument(1) {
//!             Some(token) => token.value::<u32>()?,
//!             None => 1,
//!         };
//!         Ok(CommandOutput::Value(Value::String(word.repeat(times as usize))))
//!     }
//! }
//! ```

use std::sync::Arc;

use conch_core::CommandResult;
use parking_lot::RwLock;
use tracing::debug;

use crate::context::CommandContext;
use crate::resolver::OverloadResolver;
use crate::target::CommandTarget;

/// A named console command.
pub trait Command: Send + Sync + 'static {
    /// Primary name; matched case-insensitively.
    fn name(&self) -> &str;

    fn aliases(&self) -> Vec<String> {
        Vec::new()
    }

    fn description(&self) -> Option<String> {
        None
    }

    /// Longer text shown by `help <command>`.
    fn detailed_description(&self) -> Option<String> {
        None
    }

    fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult;
}

pub type CommandHandle = Arc<dyn Command>;

/// A command made of one or more [`CommandTarget`]s with the same name.
#[derive(Debug)]
pub struct AttributeCommand {
    name: String,
    targets: RwLock<Vec<Arc<CommandTarget>>>,
}

impl AttributeCommand {
    pub fn new(target: CommandTarget) -> Self {
        Self {
            name: target.name().to_string(),
            targets: RwLock::new(vec![Arc::new(target)]),
        }
    }

    /// Appends another overload. Registration order decides ties.
    pub fn push_target(&self, target: CommandTarget) {
        self.targets.write().push(Arc::new(target));
    }

    pub fn targets(&self) -> Vec<Arc<CommandTarget>> {
        self.targets.read().clone()
    }
}

impl Command for AttributeCommand {
    fn name(&self) -> &str {
        &self.name
    }

    /// Aliases of every target, without duplicates.
    fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = Vec::new();
        for target in self.targets.read().iter() {
            for alias in target.aliases() {
                if !aliases.contains(alias) {
                    aliases.push(alias.clone());
                }
            }
        }
        aliases
    }

    /// The first description any target carries.
    fn description(&self) -> Option<String> {
        self.targets
            .read()
            .iter()
            .find_map(|t| t.get_description().map(str::to_string))
    }

    fn detailed_description(&self) -> Option<String> {
        self.targets
            .read()
            .iter()
            .find_map(|t| t.get_detailed_description().map(str::to_string))
    }

    fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let targets = self.targets();
        let resolution = OverloadResolver::new(&targets).resolve(ctx.arguments_mut())?;
        let target = &targets[resolution.target];
        debug!(
            command = %self.name,
            target = resolution.target,
            injects_context = target.injects_context(),
            "invoking command target"
        );
        target.invoke(ctx, resolution.values)
    }
}
