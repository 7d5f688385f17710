//! Command registry.
//!
//! Commands are looked up by lower-cased name or alias; the first entry that
//! carries a name wins. Targets added with [`CommandRegistry::add_target`]
//! merge into an existing attribute command of the same name.
//!
//! # Registration pass
//!
//! Crates contribute registration functions through the
//! [`COMMAND_REGISTRATIONS`] distributed slice, and
//! [`CommandRegistry::collect_registered`] runs all of them:
//!
//! ```rust,ignore
//! use conch_framework::{CommandRegistry, CommandTarget, COMMAND_REGISTRATIONS};
//!
//! #[conch_framework::linkme::distributed_slice(COMMAND_REGISTRATIONS)]
//! #[linkme(crate = conch_framework::linkme)]
//! static REGISTER_MATH: fn(&mut CommandRegistry) = register_math;
//!
//! fn register_math(registry: &mut CommandRegistry) {
//!     registry.add_target(CommandTarget::function("add", |a: i32, b: i32| a + b));
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use linkme::distributed_slice;
use tracing::{debug, warn};

use crate::command::{AttributeCommand, Command, CommandHandle};
use crate::target::CommandTarget;

/// Registration functions contributed by linked crates.
#[distributed_slice]
pub static COMMAND_REGISTRATIONS: [fn(&mut CommandRegistry)];

/// Change notification delivered to [`CommandRegistry::subscribe`] listeners.
pub enum RegistryEvent<'e> {
    Added(&'e [CommandHandle]),
    Removed(&'e [CommandHandle]),
}

type Listener = Box<dyn Fn(&RegistryEvent<'_>) + Send + Sync>;

struct Entry {
    names: Vec<String>,
    command: CommandHandle,
}

impl Entry {
    fn new(command: CommandHandle) -> Self {
        let mut entry = Self {
            names: Vec::new(),
            command,
        };
        entry.refresh_names();
        entry
    }

    fn refresh_names(&mut self) {
        let mut names = vec![self.command.name().to_lowercase()];
        for alias in self.command.aliases() {
            let alias = alias.to_lowercase();
            if !names.contains(&alias) {
                names.push(alias);
            }
        }
        self.names = names;
    }
}

/// The set of commands a console can run.
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<Entry>,
    attribute: HashMap<String, Arc<AttributeCommand>>,
    listeners: Vec<Listener>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry filled by every function in [`COMMAND_REGISTRATIONS`].
    pub fn collect_registered() -> Self {
        let mut registry = Self::new();
        for register in COMMAND_REGISTRATIONS.iter() {
            register(&mut registry);
        }
        debug!(
            functions = COMMAND_REGISTRATIONS.len(),
            commands = registry.len(),
            "collected registered commands"
        );
        registry
    }

    pub fn add_command<C: Command>(&mut self, command: C) -> &mut Self {
        self.add_shared(Arc::new(command))
    }

    pub fn add_shared(&mut self, command: CommandHandle) -> &mut Self {
        self.insert(command.clone());
        self.notify(&RegistryEvent::Added(&[command]));
        self
    }

    /// Adds several commands with a single notification.
    pub fn add_commands<I>(&mut self, commands: I) -> &mut Self
    where
        I: IntoIterator<Item = CommandHandle>,
    {
        let added: Vec<CommandHandle> = commands.into_iter().collect();
        for command in &added {
            self.insert(command.clone());
        }
        if !added.is_empty() {
            self.notify(&RegistryEvent::Added(&added));
        }
        self
    }

    /// Adds a target, merging it into the attribute command of the same name.
    pub fn add_target(&mut self, target: CommandTarget) -> &mut Self {
        if let Some(command) = self.merge_target(target) {
            self.notify(&RegistryEvent::Added(&[command]));
        }
        self
    }

    /// Adds several targets; only newly created commands are announced.
    pub fn add_targets<I>(&mut self, targets: I) -> &mut Self
    where
        I: IntoIterator<Item = CommandTarget>,
    {
        let added: Vec<CommandHandle> = targets
            .into_iter()
            .filter_map(|t| self.merge_target(t))
            .collect();
        if !added.is_empty() {
            self.notify(&RegistryEvent::Added(&added));
        }
        self
    }

    /// Removes the command registered under `name` (or an alias of it).
    pub fn remove_command(&mut self, name: &str) -> Option<CommandHandle> {
        let name = name.to_lowercase();
        let index = self.entries.iter().position(|e| e.names.contains(&name))?;
        let entry = self.entries.remove(index);
        self.attribute
            .retain(|_, c| !std::ptr::addr_eq(Arc::as_ptr(c), Arc::as_ptr(&entry.command)));
        self.notify(&RegistryEvent::Removed(std::slice::from_ref(&entry.command)));
        Some(entry.command)
    }

    /// Looks up a command by name or alias, ignoring case.
    pub fn get(&self, name: &str) -> Option<CommandHandle> {
        let name = name.to_lowercase();
        self.entries
            .iter()
            .find(|e| e.names.contains(&name))
            .map(|e| e.command.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CommandHandle> {
        self.entries.iter().map(|e| &e.command)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(&RegistryEvent<'_>) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
        self
    }

    fn insert(&mut self, command: CommandHandle) {
        let entry = Entry::new(command);
        for name in &entry.names {
            if self.entries.iter().any(|e| e.names.contains(name)) {
                warn!(name = %name, "command name already registered, earlier entry wins");
            }
        }
        self.entries.push(entry);
    }

    /// Returns the new command if the target did not merge into an existing one.
    fn merge_target(&mut self, target: CommandTarget) -> Option<CommandHandle> {
        let name = target.name().to_string();
        if let Some(existing) = self.attribute.get(&name).cloned() {
            existing.push_target(target);
            let handle: CommandHandle = existing;
            if let Some(entry) = self
                .entries
                .iter_mut()
                .find(|e| std::ptr::addr_eq(Arc::as_ptr(&e.command), Arc::as_ptr(&handle)))
            {
                entry.refresh_names();
            }
            debug!(command = %name, "merged target into existing command");
            return None;
        }

        if self.contains(&name) {
            warn!(command = %name, "a non-attribute command already uses this name, target ignored");
            return None;
        }

        let command = Arc::new(AttributeCommand::new(target));
        self.attribute.insert(name, command.clone());
        let handle: CommandHandle = command;
        self.insert(handle.clone());
        Some(handle)
    }

    fn notify(&self, event: &RegistryEvent<'_>) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| &e.names))
            .finish()
    }
}
