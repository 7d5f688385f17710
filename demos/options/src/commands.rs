use std::sync::Arc;

use conch::core::{
    CommandError, CommandOutput, CommandResult, KeyPrompt, LogEntry, NavigationKey, TextPrompt,
};
use conch::framework::{Command, CommandContext};
use parking_lot::Mutex;

use crate::store::{OptionItem, OptionsError, OptionsStore};

impl From<OptionsError> for CommandError {
    fn from(err: OptionsError) -> Self {
        match err {
            OptionsError::UnknownOption(_) | OptionsError::InvalidValue { .. } => {
                CommandError::command(err.to_string())
            }
            other => CommandError::Unexpected(other.into()),
        }
    }
}

// ============================================================================
// optionslist
// ============================================================================

pub struct OptionsList {
    store: OptionsStore,
}

impl OptionsList {
    pub fn new(store: OptionsStore) -> Self {
        Self { store }
    }
}

impl Command for OptionsList {
    fn name(&self) -> &str {
        "optionslist"
    }

    fn aliases(&self) -> Vec<String> {
        vec![
            "settingslist".into(),
            "listoptions".into(),
            "listsettings".into(),
        ]
    }

    fn description(&self) -> Option<String> {
        Some("Displays a list of all options.".into())
    }

    fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        ctx.check_argument_count(0, 0)?;
        let mut text = String::from("List of options:");
        for item in self.store.items() {
            text.push_str(&format!(
                "\n- {}:{} (default: {})",
                item.name, item.value, item.default
            ));
        }
        ctx.logger().log(LogEntry::info(text).with_color_tag("info"));
        Ok(CommandOutput::None)
    }
}

// ============================================================================
// changeoption
// ============================================================================

#[derive(Default)]
struct Selection {
    items: Vec<OptionItem>,
    index: usize,
    target: Option<String>,
}

enum ListState {
    Selecting,
    Selected,
    Cancelled,
}

/// Changes one option, either directly (`changeoption volume 20`) or through
/// an arrow-key selection list followed by a value prompt.
pub struct ChangeOption {
    store: OptionsStore,
    navigation: Arc<KeyPrompt>,
    value: Arc<TextPrompt>,
    selection: Mutex<Selection>,
}

impl ChangeOption {
    pub fn new(store: OptionsStore) -> Self {
        Self {
            store,
            navigation: Arc::new(KeyPrompt::new()),
            value: Arc::new(TextPrompt::new()),
            selection: Mutex::new(Selection::default()),
        }
    }

    fn ask_for_value(&self, ctx: &CommandContext<'_>, name: String) -> CommandResult {
        self.selection.lock().target = Some(name);
        ctx.logger().info("Enter value...");
        Ok(CommandOutput::prompt(self.value.clone()))
    }

    fn navigate(&self, ctx: &CommandContext<'_>) -> CommandResult {
        let key = self.navigation.key();
        let mut selection = self.selection.lock();
        let last = selection.items.len().saturating_sub(1);

        match key {
            NavigationKey::Up => selection.index = selection.index.saturating_sub(1),
            NavigationKey::Down => selection.index = (selection.index + 1).min(last),
            NavigationKey::Cancel => {
                log_list(ctx, &selection, ListState::Cancelled);
                selection.target = None;
                return Ok(CommandOutput::None);
            }
            NavigationKey::Confirm => {
                log_list(ctx, &selection, ListState::Selected);
                let name = selection.items.get(selection.index).map(|i| i.name.clone());
                drop(selection);
                return match name {
                    Some(name) => self.ask_for_value(ctx, name),
                    None => Err(CommandError::command("There are no options to change")),
                };
            }
            _ => {}
        }

        log_list(ctx, &selection, ListState::Selecting);
        Ok(CommandOutput::prompt(self.navigation.clone()))
    }
}

fn log_list(ctx: &CommandContext<'_>, selection: &Selection, state: ListState) {
    let (header, marker) = match state {
        ListState::Selecting => ("Select Setting", ">"),
        ListState::Selected => ("Setting Selected", "]"),
        ListState::Cancelled => ("Cancelled", "]"),
    };

    let mut text = String::from(header);
    for (i, item) in selection.items.iter().enumerate() {
        let cursor = if i == selection.index { marker } else { " " };
        text.push_str(&format!(
            "\n{cursor} {}: {} (default value:{})",
            item.name, item.value, item.default
        ));
    }
    ctx.logger().info(text);
}

impl Command for ChangeOption {
    fn name(&self) -> &str {
        "changeoption"
    }

    fn aliases(&self) -> Vec<String> {
        vec![
            "setoption".into(),
            "changesetting".into(),
            "setsetting".into(),
        ]
    }

    fn description(&self) -> Option<String> {
        Some("Changes the value of an option.".into())
    }

    fn detailed_description(&self) -> Option<String> {
        Some(
            "changeoption - pick an option from a list with up/down, confirm, then enter a value\n\
             changeoption <name> - enter a new value for <name>\n\
             changeoption <name> <value> - set <name> to <value>"
                .into(),
        )
    }

    fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        if ctx.is_prompt(&self.navigation) {
            return self.navigate(ctx);
        }

        if ctx.is_prompt(&self.value) {
            let Some(target) = self.selection.lock().target.take() else {
                return Err(CommandError::command("No option selected"));
            };
            let value = self.store.set_text(&target, &self.value.text())?;
            ctx.logger().info(format!("Changed '{target}' to {value}"));
            return Ok(CommandOutput::None);
        }

        ctx.check_argument_count(0, 2)?;
        match ctx.arguments() {
            [] => {
                let items = self.store.items();
                if items.is_empty() {
                    return Err(CommandError::command("There are no options to change"));
                }
                let mut selection = self.selection.lock();
                *selection = Selection {
                    items,
                    index: 0,
                    target: None,
                };
                log_list(ctx, &selection, ListState::Selecting);
                Ok(CommandOutput::prompt(self.navigation.clone()))
            }
            [name] => {
                let item = self
                    .store
                    .get(name.text())
                    .ok_or_else(|| OptionsError::UnknownOption(name.text().to_string()))?;
                self.ask_for_value(ctx, item.name)
            }
            [name, value, ..] => {
                let name = name.text().to_string();
                let value = self.store.set_text(&name, value.text())?;
                ctx.logger()
                    .info(format!("Changed '{}' to {value}", name.to_lowercase()));
                Ok(CommandOutput::None)
            }
        }
    }
}

// ============================================================================
// revertoptions / applyoptions
// ============================================================================

pub struct RevertOptions {
    store: OptionsStore,
}

impl RevertOptions {
    pub fn new(store: OptionsStore) -> Self {
        Self { store }
    }
}

impl Command for RevertOptions {
    fn name(&self) -> &str {
        "revertoptions"
    }

    fn aliases(&self) -> Vec<String> {
        vec![
            "revertsettings".into(),
            "optionsrevert".into(),
            "settingsrevert".into(),
        ]
    }

    fn description(&self) -> Option<String> {
        Some("Loads options from disk while discarding any unsaved changes.".into())
    }

    fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        ctx.check_argument_count(0, 0)?;
        let loaded = self.store.revert()?;
        ctx.logger()
            .info(format!("Options reverted, {loaded} loaded from disk"));
        Ok(CommandOutput::None)
    }
}

/// Writes the options in a background task; the session reports the result
/// once the file is written.
pub struct ApplyOptions {
    store: OptionsStore,
}

impl ApplyOptions {
    pub fn new(store: OptionsStore) -> Self {
        Self { store }
    }
}

impl Command for ApplyOptions {
    fn name(&self) -> &str {
        "applyoptions"
    }

    fn aliases(&self) -> Vec<String> {
        vec![
            "applysettings".into(),
            "optionsapply".into(),
            "settingsapply".into(),
        ]
    }

    fn description(&self) -> Option<String> {
        Some("Saves options to disk.".into())
    }

    fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        ctx.check_argument_count(0, 0)?;
        let store = self.store.clone();
        Ok(CommandOutput::task(async move {
            store
                .apply()
                .await
                .map(|count| format!("Saved {count} options"))
        }))
    }
}
