//! String to value converters.
//!
//! A [`ValueParserRegistry`] holds an ordered list of [`ValueParser`]s. Parsing
//! a token runs every parser and keeps every success, so `"5"` yields an
//! integer of each width, both floats, a decimal and a string. Failures are
//! silent: a token can never make parsing fail, it just ends up with fewer
//! candidates.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::trace;

use super::{ArgType, Value, ValueType};
use crate::argument::ArgumentToken;

/// Converts raw token text into one typed [`Value`].
pub trait ValueParser: Send + Sync {
    /// The runtime type of every value this parser produces.
    fn value_type(&self) -> ValueType;

    fn try_parse(&self, text: &str) -> Option<Value>;
}

// ============================================================================
// Built-in parsers
// ============================================================================

/// Parser backed by [`FromStr`]. Surrounding whitespace is ignored.
pub struct StdParser<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> StdParser<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for StdParser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ValueParser for StdParser<T>
where
    T: FromStr + ArgType + Into<Value>,
{
    fn value_type(&self) -> ValueType {
        T::value_type()
    }

    fn try_parse(&self, text: &str) -> Option<Value> {
        text.trim().parse::<T>().ok().map(Into::into)
    }
}

/// Accepts `true` / `false` in any letter case.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoolParser;

impl ValueParser for BoolParser {
    fn value_type(&self) -> ValueType {
        ValueType::Bool
    }

    fn try_parse(&self, text: &str) -> Option<Value> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("true") {
            Some(Value::Bool(true))
        } else if text.eq_ignore_ascii_case("false") {
            Some(Value::Bool(false))
        } else {
            None
        }
    }
}

/// Pass-through parser; always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringParser;

impl ValueParser for StringParser {
    fn value_type(&self) -> ValueType {
        ValueType::String
    }

    fn try_parse(&self, text: &str) -> Option<Value> {
        Some(Value::String(text.to_owned()))
    }
}

/// Parser built from a closure, for user-defined value types.
pub struct FnParser<F> {
    value_type: ValueType,
    parse: F,
}

impl<F> FnParser<F>
where
    F: Fn(&str) -> Option<Value> + Send + Sync,
{
    pub fn new(value_type: ValueType, parse: F) -> Self {
        Self { value_type, parse }
    }
}

impl<F> ValueParser for FnParser<F>
where
    F: Fn(&str) -> Option<Value> + Send + Sync,
{
    fn value_type(&self) -> ValueType {
        self.value_type
    }

    fn try_parse(&self, text: &str) -> Option<Value> {
        (self.parse)(text).filter(|value| value.value_type() == self.value_type)
    }
}

// ============================================================================
// ValueParserRegistry
// ============================================================================

/// Ordered collection of value parsers.
#[derive(Clone)]
pub struct ValueParserRegistry {
    parsers: Vec<Arc<dyn ValueParser>>,
}

impl ValueParserRegistry {
    /// A registry with no parsers; every token parses to zero candidates.
    pub fn empty() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// The default parser set.
    ///
    /// Order: `i32, u32, f32, f64, decimal, i64, u64, u8, i8, i16, u16, bool, string`.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry
            .register(StdParser::<i32>::new())
            .register(StdParser::<u32>::new())
            .register(StdParser::<f32>::new())
            .register(StdParser::<f64>::new())
            .register(StdParser::<Decimal>::new())
            .register(StdParser::<i64>::new())
            .register(StdParser::<u64>::new())
            .register(StdParser::<u8>::new())
            .register(StdParser::<i8>::new())
            .register(StdParser::<i16>::new())
            .register(StdParser::<u16>::new())
            .register(BoolParser)
            .register(StringParser);
        registry
    }

    /// Appends a parser; it runs after every parser registered before it.
    pub fn register<P: ValueParser + 'static>(&mut self, parser: P) -> &mut Self {
        self.parsers.push(Arc::new(parser));
        self
    }

    /// Inserts a parser at `index`, clamped to the current length.
    pub fn insert<P: ValueParser + 'static>(&mut self, index: usize, parser: P) -> &mut Self {
        let index = index.min(self.parsers.len());
        self.parsers.insert(index, Arc::new(parser));
        self
    }

    /// Registers a closure parser for a user-defined type.
    ///
    /// The parser is placed before the trailing string parser so custom
    /// candidates keep the usual ordering of "string last".
    pub fn register_fn<T, F>(&mut self, parse: F) -> &mut Self
    where
        T: ArgType,
        F: Fn(&str) -> Option<Value> + Send + Sync + 'static,
    {
        let parser = FnParser::new(T::value_type(), parse);
        let index = self
            .parsers
            .iter()
            .rposition(|p| p.value_type().is_string())
            .unwrap_or(self.parsers.len());
        self.insert(index, parser)
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// Runs every parser on `text`.
    ///
    /// Candidates are unique by runtime type; the first parser to produce a
    /// given type wins.
    pub fn parse(&self, text: &str) -> Vec<Value> {
        let mut candidates: Vec<Value> = Vec::with_capacity(self.parsers.len());
        for parser in &self.parsers {
            let Some(value) = parser.try_parse(text) else {
                continue;
            };
            if candidates
                .iter()
                .any(|c| c.value_type() == value.value_type())
            {
                continue;
            }
            candidates.push(value);
        }
        trace!(text, count = candidates.len(), "parsed token candidates");
        candidates
    }

    /// Parses `text` into an [`ArgumentToken`].
    pub fn parse_token(&self, text: &str) -> ArgumentToken {
        ArgumentToken::new(text, self.parse(text))
    }
}

impl Default for ValueParserRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for ValueParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.parsers.iter().map(|p| p.value_type()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(values: &[Value]) -> Vec<ValueType> {
        values.iter().map(Value::value_type).collect()
    }

    #[test]
    fn test_integer_text_yields_every_numeric_width() {
        let parsers = ValueParserRegistry::standard();
        let candidates = parsers.parse("5");
        assert_eq!(
            types(&candidates),
            vec![
                ValueType::I32,
                ValueType::U32,
                ValueType::F32,
                ValueType::F64,
                ValueType::Decimal,
                ValueType::I64,
                ValueType::U64,
                ValueType::U8,
                ValueType::I8,
                ValueType::I16,
                ValueType::U16,
                ValueType::String,
            ]
        );
        assert_eq!(candidates[0], Value::I32(5));
        assert_eq!(candidates.last(), Some(&Value::String("5".into())));
    }

    #[test]
    fn test_negative_and_out_of_range_values() {
        let parsers = ValueParserRegistry::standard();
        let candidates = types(&parsers.parse("-200"));
        assert!(candidates.contains(&ValueType::I32));
        assert!(candidates.contains(&ValueType::I16));
        assert!(!candidates.contains(&ValueType::U32));
        assert!(!candidates.contains(&ValueType::I8));
        assert!(!candidates.contains(&ValueType::U8));
    }

    #[test]
    fn test_bool_is_case_insensitive() {
        let parsers = ValueParserRegistry::standard();
        assert_eq!(parsers.parse("TRUE")[0], Value::Bool(true));
        assert_eq!(parsers.parse("False")[0], Value::Bool(false));
        assert_eq!(types(&parsers.parse("yes")), vec![ValueType::String]);
    }

    #[test]
    fn test_parse_never_fails() {
        let parsers = ValueParserRegistry::standard();
        assert_eq!(types(&parsers.parse("")), vec![ValueType::String]);
        assert!(ValueParserRegistry::empty().parse("5").is_empty());
    }

    #[test]
    fn test_candidates_are_distinct_by_type() {
        let mut parsers = ValueParserRegistry::empty();
        parsers
            .register(StdParser::<i32>::new())
            .register(FnParser::new(ValueType::I32, |_| Some(Value::I32(99))))
            .register(StringParser);
        let candidates = parsers.parse("7");
        assert_eq!(candidates, vec![Value::I32(7), Value::String("7".into())]);
    }

    #[test]
    fn test_register_fn_runs_before_string() {
        let mut parsers = ValueParserRegistry::standard();
        parsers.register_fn::<char, _>(|text| {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(Value::Char(c)),
                _ => None,
            }
        });
        let candidates = types(&parsers.parse("x"));
        assert_eq!(candidates, vec![ValueType::Char, ValueType::String]);
    }

    #[test]
    fn test_fn_parser_rejects_mismatched_type() {
        let parser = FnParser::new(ValueType::Bool, |_| Some(Value::I32(1)));
        assert!(parser.try_parse("anything").is_none());
    }

    #[test]
    fn test_float_text_skips_integers() {
        let parsers = ValueParserRegistry::standard();
        let candidates = types(&parsers.parse("2.5"));
        assert_eq!(
            candidates,
            vec![
                ValueType::F32,
                ValueType::F64,
                ValueType::Decimal,
                ValueType::String
            ]
        );
    }
}
