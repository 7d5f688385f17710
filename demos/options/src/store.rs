use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use conch::core::{Value, ValueParserRegistry, ValueType};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info, warn};

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("Setting '{0}' does not exist!")]
    UnknownOption(String),

    #[error("Unable to parse '{text}' to {expected}")]
    InvalidValue { expected: ValueType, text: String },

    #[error("Failed to access options file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed options file: {0}")]
    Format(#[from] serde_json::Error),
}

// ─── Items ────────────────────────────────────────────────────────────────────

/// One named option with its current and default value.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionItem {
    pub name: String,
    pub value: Value,
    pub default: Value,
}

impl OptionItem {
    pub fn value_type(&self) -> ValueType {
        self.default.value_type()
    }
}

// ─── OptionsStore ─────────────────────────────────────────────────────────────

/// A shared, ordered set of typed options.
///
/// Names are lower-cased. Values keep the type of their default; text input
/// is converted with the store's [`ValueParserRegistry`]. Changes stay in
/// memory until [`apply`](Self::apply) writes them to the save file as a JSON
/// object of `name → text`.
#[derive(Clone, Default)]
pub struct OptionsStore {
    items: Arc<RwLock<Vec<OptionItem>>>,
    parsers: Arc<ValueParserRegistry>,
    save_path: Option<PathBuf>,
}

impl OptionsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store persisted at `path`.
    pub fn with_save_path(path: impl Into<PathBuf>) -> Self {
        Self {
            save_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn save_path(&self) -> Option<&Path> {
        self.save_path.as_deref()
    }

    /// Declares an option. Redefining keeps the position and resets the value.
    pub fn define(&self, name: &str, default: impl Into<Value>) -> &Self {
        let name = name.to_lowercase();
        let default = default.into();
        let mut items = self.items.write();
        let item = OptionItem {
            name: name.clone(),
            value: default.clone(),
            default,
        };
        match items.iter_mut().find(|i| i.name == name) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
        self
    }

    pub fn items(&self) -> Vec<OptionItem> {
        self.items.read().clone()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn get(&self, name: &str) -> Option<OptionItem> {
        let name = name.to_lowercase();
        self.items.read().iter().find(|i| i.name == name).cloned()
    }

    pub fn value(&self, name: &str) -> Option<Value> {
        self.get(name).map(|i| i.value)
    }

    /// Sets an option from a typed value; mismatched types are converted
    /// through their text form.
    pub fn set(&self, name: &str, value: Value) -> Result<Value, OptionsError> {
        let expected = self.require(name)?.value_type();
        let value = if value.value_type() == expected {
            value
        } else {
            self.convert(expected, &value.to_string())?
        };
        self.store(name, value.clone());
        Ok(value)
    }

    /// Sets an option from user text.
    pub fn set_text(&self, name: &str, text: &str) -> Result<Value, OptionsError> {
        let expected = self.require(name)?.value_type();
        let value = self.convert(expected, text)?;
        self.store(name, value.clone());
        Ok(value)
    }

    /// Resets every option to its default.
    pub fn reset(&self) {
        for item in self.items.write().iter_mut() {
            item.value = item.default.clone();
        }
    }

    /// Writes the current values to the save file.
    pub async fn apply(&self) -> Result<usize, OptionsError> {
        let Some(path) = self.save_path.clone() else {
            warn!("no options save path configured, nothing written");
            return Ok(0);
        };

        let snapshot: BTreeMap<String, String> = self
            .items()
            .into_iter()
            .map(|i| (i.name, i.value.to_string()))
            .collect();
        let json = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|source| OptionsError::Io {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), count = snapshot.len(), "options saved");
        Ok(snapshot.len())
    }

    /// Discards unsaved changes: defaults, then whatever the save file holds.
    ///
    /// Unknown names and unparsable values in the file are skipped.
    pub fn revert(&self) -> Result<usize, OptionsError> {
        self.reset();
        let Some(path) = &self.save_path else {
            return Ok(0);
        };
        if !path.exists() {
            debug!(path = %path.display(), "no saved options yet");
            return Ok(0);
        }

        let text = std::fs::read_to_string(path).map_err(|source| OptionsError::Io {
            path: path.clone(),
            source,
        })?;
        let saved: BTreeMap<String, String> = serde_json::from_str(&text)?;

        let mut loaded = 0;
        for (name, value) in saved {
            match self.set_text(&name, &value) {
                Ok(_) => loaded += 1,
                Err(e) => warn!(option = %name, error = %e, "skipping saved option"),
            }
        }
        Ok(loaded)
    }

    fn require(&self, name: &str) -> Result<OptionItem, OptionsError> {
        self.get(name)
            .ok_or_else(|| OptionsError::UnknownOption(name.to_string()))
    }

    fn store(&self, name: &str, value: Value) {
        let name = name.to_lowercase();
        if let Some(item) = self.items.write().iter_mut().find(|i| i.name == name) {
            debug!(option = %name, value = %value, "option changed");
            item.value = value;
        }
    }

    fn convert(&self, expected: ValueType, text: &str) -> Result<Value, OptionsError> {
        let invalid = || OptionsError::InvalidValue {
            expected,
            text: text.to_string(),
        };
        match expected {
            ValueType::String => Ok(Value::String(text.to_string())),
            ValueType::Char => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err(invalid()),
                }
            }
            _ => self
                .parsers
                .parse(text)
                .into_iter()
                .find(|v| v.value_type() == expected)
                .ok_or_else(invalid),
        }
    }
}

impl std::fmt::Debug for OptionsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionsStore")
            .field("items", &*self.items.read())
            .field("save_path", &self.save_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> OptionsStore {
        let store = OptionsStore::new();
        store
            .define("Volume", 80_i32)
            .define("fullscreen", false)
            .define("nickname", "player");
        store
    }

    #[test]
    fn test_set_text_keeps_type() {
        let store = store();
        assert_eq!(store.set_text("volume", "35").unwrap(), Value::I32(35));
        assert_eq!(store.set_text("FULLSCREEN", "True").unwrap(), Value::Bool(true));
        assert_eq!(
            store.set_text("nickname", "two words").unwrap(),
            Value::from("two words")
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let store = store();
        let err = store.set_text("volume", "loud").unwrap_err();
        assert_eq!(err.to_string(), "Unable to parse 'loud' to i32");
        assert_eq!(store.value("volume"), Some(Value::I32(80)));

        assert!(matches!(
            store.set_text("missing", "1"),
            Err(OptionsError::UnknownOption(_))
        ));
    }

    #[test]
    fn test_set_converts_other_types() {
        let store = store();
        assert_eq!(store.set("volume", Value::I64(12)).unwrap(), Value::I32(12));
    }

    #[tokio::test]
    async fn test_apply_then_revert() {
        let dir = tempfile::tempdir().unwrap();
        let store = OptionsStore::with_save_path(dir.path().join("options.json"));
        store.define("volume", 80_i32).define("fullscreen", false);

        store.set_text("volume", "20").unwrap();
        assert_eq!(store.apply().await.unwrap(), 2);

        store.set_text("volume", "99").unwrap();
        store.set_text("fullscreen", "true").unwrap();
        assert_eq!(store.revert().unwrap(), 2);

        assert_eq!(store.value("volume"), Some(Value::I32(20)));
        assert_eq!(store.value("fullscreen"), Some(Value::Bool(false)));
    }

    #[test]
    fn test_revert_without_file_resets() {
        let store = store();
        store.set_text("volume", "1").unwrap();
        assert_eq!(store.revert().unwrap(), 0);
        assert_eq!(store.value("volume"), Some(Value::I32(80)));
    }
}
