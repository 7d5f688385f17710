//! Multi-turn prompts.
//!
//! A command returns a prompt to keep itself active: the console routes the
//! next input line to the prompt instead of looking up a new command, then
//! runs the same command again with the tokens the prompt prepared. The
//! command tells the turns apart through the active prompt on its context.
//!
//! # Example
//!
//! ```rust,ignore
//! struct Rename {
//!     prompt: Arc<TextPrompt>,
//! }
//!
//! impl Command for Rename {
//!     fn name(&self) -> &str { "rename" }
//!
//!     fn run(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
//!         if ctx.is_prompt(&self.prompt) {
//!             ctx.logger().info(format!("Renamed to {}", self.prompt.text()));
//!             return Ok(CommandOutput::None);
//!         }
//!         ctx.logger().info("Enter a new name");
//!         Ok(CommandOutput::prompt(self.prompt.clone()))
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

use crate::argument::ArgumentToken;
use crate::value::Value;

/// How a front end should read the next input while a prompt is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// A full line of text.
    #[default]
    Line,
    /// A single key press, named (`up`, `escape`, ...) or a character.
    Key,
}

/// A resumable multi-turn continuation.
pub trait Prompt: Send + Sync + 'static {
    /// Whether `input` is acceptable. Rejected input leaves the console
    /// untouched.
    fn can_execute(&self, _input: &str) -> bool {
        true
    }

    /// When true the console tokenizes the raw input with its line parser
    /// instead of calling [`prepare`](Self::prepare).
    fn reparses_raw_input(&self) -> bool {
        false
    }

    fn input_mode(&self) -> InputMode {
        InputMode::Line
    }

    /// Turns accepted input into argument tokens for the command.
    fn prepare(&self, input: &str) -> Vec<ArgumentToken>;
}

/// Shared handle to a pending prompt. Prompts are compared by identity.
pub type PromptHandle = Arc<dyn Prompt>;

/// Identity comparison between a stored handle and a concrete prompt.
pub fn same_prompt<P: Prompt>(handle: &PromptHandle, prompt: &Arc<P>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(handle), Arc::as_ptr(prompt))
}

// ============================================================================
// TextPrompt
// ============================================================================

/// Accepts any input and forwards it verbatim as one string argument.
#[derive(Debug, Default)]
pub struct TextPrompt {
    text: Mutex<String>,
}

impl TextPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent input this prompt accepted.
    pub fn text(&self) -> String {
        self.text.lock().clone()
    }
}

impl Prompt for TextPrompt {
    fn prepare(&self, input: &str) -> Vec<ArgumentToken> {
        *self.text.lock() = input.to_owned();
        vec![ArgumentToken::literal(input)]
    }
}

// ============================================================================
// LinePrompt
// ============================================================================

/// Asks for a fresh argument list; the console re-tokenizes the input.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinePrompt;

impl Prompt for LinePrompt {
    fn reparses_raw_input(&self) -> bool {
        true
    }

    fn prepare(&self, input: &str) -> Vec<ArgumentToken> {
        input.split_whitespace().map(ArgumentToken::literal).collect()
    }
}

// ============================================================================
// KeyPrompt
// ============================================================================

/// Navigation keys recognised by [`KeyPrompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NavigationKey {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
    Confirm,
    Cancel,
}

impl fmt::Display for NavigationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
        };
        f.write_str(name)
    }
}

static KEY_NAMES: LazyLock<HashMap<&'static str, NavigationKey>> = LazyLock::new(|| {
    HashMap::from([
        ("up", NavigationKey::Up),
        ("down", NavigationKey::Down),
        ("left", NavigationKey::Left),
        ("right", NavigationKey::Right),
        ("confirm", NavigationKey::Confirm),
        ("enter", NavigationKey::Confirm),
        ("return", NavigationKey::Confirm),
        ("cancel", NavigationKey::Cancel),
        ("escape", NavigationKey::Cancel),
        ("esc", NavigationKey::Cancel),
    ])
});

/// Reads one key press.
///
/// Named keys (`up`, `down`, `left`, `right`, `confirm`, `cancel`, plus the
/// terminal names `enter`, `return`, `escape`, `esc`) are matched
/// case-insensitively and set [`key`](Self::key). Anything else is taken as a
/// character press and resets the key to [`NavigationKey::None`].
#[derive(Debug, Default)]
pub struct KeyPrompt {
    key: Mutex<NavigationKey>,
}

impl KeyPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// The navigation key of the most recent press.
    pub fn key(&self) -> NavigationKey {
        *self.key.lock()
    }

    /// Maps raw input to a navigation key without touching prompt state.
    pub fn navigation_key(input: &str) -> NavigationKey {
        KEY_NAMES
            .get(input.trim().to_lowercase().as_str())
            .copied()
            .unwrap_or_default()
    }
}

impl Prompt for KeyPrompt {
    fn can_execute(&self, input: &str) -> bool {
        !input.is_empty()
    }

    fn input_mode(&self) -> InputMode {
        InputMode::Key
    }

    fn prepare(&self, input: &str) -> Vec<ArgumentToken> {
        let key = Self::navigation_key(input);
        *self.key.lock() = key;

        let text = if key == NavigationKey::None {
            input.chars().next().map(String::from).unwrap_or_default()
        } else {
            input.trim().to_lowercase()
        };

        let mut candidates = Vec::with_capacity(2);
        let mut chars = text.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            candidates.push(Value::Char(c));
        }
        candidates.push(Value::String(text.clone()));
        vec![ArgumentToken::new(text, candidates)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    #[test]
    fn test_text_prompt_forwards_verbatim() {
        let prompt = TextPrompt::new();
        let tokens = prompt.prepare("hello  world ");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text(), "hello  world ");
        assert_eq!(tokens[0].candidates(), &[Value::from("hello  world ")]);
        assert_eq!(prompt.text(), "hello  world ");
        assert!(prompt.can_execute(""));
    }

    #[test]
    fn test_key_prompt_named_keys() {
        let prompt = KeyPrompt::new();
        assert!(!prompt.can_execute(""));

        let tokens = prompt.prepare("Escape");
        assert_eq!(prompt.key(), NavigationKey::Cancel);
        assert_eq!(tokens[0].text(), "escape");

        prompt.prepare("UP");
        assert_eq!(prompt.key(), NavigationKey::Up);

        prompt.prepare("confirm");
        assert_eq!(prompt.key(), NavigationKey::Confirm);
    }

    #[test]
    fn test_key_prompt_character_resets_key() {
        let prompt = KeyPrompt::new();
        prompt.prepare("down");
        let tokens = prompt.prepare("q");
        assert_eq!(prompt.key(), NavigationKey::None);
        let types: Vec<_> = tokens[0].candidates().iter().map(Value::value_type).collect();
        assert_eq!(types, vec![ValueType::Char, ValueType::String]);
        assert_eq!(tokens[0].try_value::<char>(), Some('q'));
    }

    #[test]
    fn test_key_prompt_takes_first_character() {
        let prompt = KeyPrompt::new();
        let tokens = prompt.prepare("xyz");
        assert_eq!(tokens[0].text(), "x");
        assert_eq!(prompt.input_mode(), InputMode::Key);
    }

    #[test]
    fn test_same_prompt_is_identity() {
        let a = Arc::new(TextPrompt::new());
        let b = Arc::new(TextPrompt::new());
        let handle: PromptHandle = a.clone();
        assert!(same_prompt(&handle, &a));
        assert!(!same_prompt(&handle, &b));
    }

    #[test]
    fn test_line_prompt_reparses() {
        assert!(LinePrompt.reparses_raw_input());
        assert_eq!(LinePrompt.prepare("a b").len(), 2);
    }
}
