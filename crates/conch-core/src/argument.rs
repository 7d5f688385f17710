//! Argument tokens.

use std::fmt;

use crate::error::CommandError;
use crate::value::{ArgType, Value, ValueType};

/// One whitespace-delimited piece of input with every value it parsed to.
///
/// Candidates are unique by [`ValueType`] and keep parser order. The overload
/// resolver may narrow them; nothing ever adds to them.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentToken {
    text: String,
    candidates: Vec<Value>,
}

impl ArgumentToken {
    /// Builds a token, dropping any candidate whose type already appeared.
    pub fn new(text: impl Into<String>, candidates: impl IntoIterator<Item = Value>) -> Self {
        let mut unique: Vec<Value> = Vec::new();
        for candidate in candidates {
            if !unique
                .iter()
                .any(|c| c.value_type() == candidate.value_type())
            {
                unique.push(candidate);
            }
        }
        Self {
            text: text.into(),
            candidates: unique,
        }
    }

    /// A token whose only candidate is its own text.
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            candidates: vec![Value::String(text.clone())],
            text,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn candidates(&self) -> &[Value] {
        &self.candidates
    }

    /// Keeps only candidates whose type is in `accepted`. String candidates
    /// always survive.
    pub fn narrow(&mut self, accepted: &[ValueType]) {
        self.candidates
            .retain(|c| c.value_type().is_string() || accepted.contains(&c.value_type()));
    }

    /// The first candidate of type `T`.
    pub fn try_value<T: ArgType>(&self) -> Option<T> {
        let ty = T::value_type();
        self.candidates
            .iter()
            .find(|c| c.value_type() == ty)
            .cloned()
            .and_then(T::from_value)
    }

    /// Like [`try_value`](Self::try_value), failing with
    /// [`CommandError::ArgumentParseFailure`].
    pub fn value<T: ArgType>(&self) -> Result<T, CommandError> {
        self.try_value().ok_or_else(|| CommandError::ArgumentParseFailure {
            expected: T::value_type(),
            literal: self.text.clone(),
        })
    }

    pub fn can_get<T: ArgType>(&self) -> bool {
        let ty = T::value_type();
        self.candidates.iter().any(|c| c.value_type() == ty)
    }
}

impl fmt::Display for ArgumentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
