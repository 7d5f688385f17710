//! Line tokenizing.
//!
//! The console only depends on the [`LineParser`] trait: raw input in,
//! argument tokens out, command name first. [`ShellLineParser`] is the
//! default: a quote-aware whitespace splitter whose pieces are parsed with a
//! [`ValueParserRegistry`].

use std::sync::Arc;

use conch_core::{ArgumentToken, ValueParserRegistry};

/// Turns one raw input line into argument tokens.
pub trait LineParser: Send + Sync {
    fn parse_line(&self, line: &str) -> Vec<ArgumentToken>;
}

/// Splits on whitespace, honouring quotes, then parses each piece.
#[derive(Debug, Clone, Default)]
pub struct ShellLineParser {
    values: Arc<ValueParserRegistry>,
}

impl ShellLineParser {
    pub fn new(values: ValueParserRegistry) -> Self {
        Self {
            values: Arc::new(values),
        }
    }

    pub fn values(&self) -> &ValueParserRegistry {
        &self.values
    }
}

impl LineParser for ShellLineParser {
    fn parse_line(&self, line: &str) -> Vec<ArgumentToken> {
        shell_split(line)
            .iter()
            .map(|piece| self.values.parse_token(piece))
            .collect()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    Unquoted,
    Single,
    Double,
}

/// Splits `input` into words the way a POSIX shell would, minus expansion.
///
/// Quotes group whitespace, and `""` yields an empty word. A backslash takes
/// the next character literally except inside single quotes; a trailing one
/// is kept as is.
pub fn shell_split(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    // A word has started even if it is still empty, e.g. after `''`.
    let mut started = false;
    let mut quote = Quote::Unquoted;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::Unquoted,
            (Quote::Unquoted, '\'') => {
                quote = Quote::Single;
                started = true;
            }
            (Quote::Unquoted, '"') => {
                quote = Quote::Double;
                started = true;
            }
            (Quote::Unquoted | Quote::Double, '\\') => {
                word.push(chars.next().unwrap_or('\\'));
                started = true;
            }
            (Quote::Unquoted, c) if c.is_whitespace() => {
                if started {
                    words.push(std::mem::take(&mut word));
                    started = false;
                }
            }
            (_, c) => {
                word.push(c);
                started = true;
            }
        }
    }

    if started {
        words.push(word);
    }
    words
}
