//! A persistent options store with console commands to inspect and edit it.
//!
//! | command | aliases | description |
//! |---------|---------|-------------|
//! | `optionslist` | `settingslist`, `listoptions`, `listsettings` | Lists options with their defaults |
//! | `changeoption` | `setoption`, `changesetting`, `setsetting` | Changes one option |
//! | `revertoptions` | `revertsettings`, `optionsrevert`, `settingsrevert` | Discards unsaved changes |
//! | `applyoptions` | `applysettings`, `optionsapply`, `settingsapply` | Saves options to disk |
//!
//! `changeoption` without arguments shows a selection list driven by
//! `up`/`down`/`enter`/`esc`, then asks for the new value.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = OptionsStore::with_save_path("options.json");
//! store.define("volume", 80_i32).define("fullscreen", false);
//! store.revert()?;
//!
//! let mut registry = CommandRegistry::collect_registered();
//! conch_options::register_options(&mut registry, &store);
//! ```

mod commands;
mod store;

pub use commands::{ApplyOptions, ChangeOption, OptionsList, RevertOptions};
pub use store::{OptionItem, OptionsError, OptionsStore};

use std::sync::Arc;

use conch::framework::{CommandHandle, CommandRegistry};

/// Adds the option commands, all sharing `store`.
pub fn register_options(registry: &mut CommandRegistry, store: &OptionsStore) {
    registry.add_commands(options_commands(store));
}

pub fn options_commands(store: &OptionsStore) -> Vec<CommandHandle> {
    vec![
        Arc::new(OptionsList::new(store.clone())),
        Arc::new(ChangeOption::new(store.clone())),
        Arc::new(RevertOptions::new(store.clone())),
        Arc::new(ApplyOptions::new(store.clone())),
    ]
}
