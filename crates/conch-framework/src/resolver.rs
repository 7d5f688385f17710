//! Overload resolution.
//!
//! Given the targets of one attribute command and the argument tokens of one
//! input line, [`OverloadResolver::resolve`] finds the first target, in
//! registration order, whose parameter types match one choice of candidate
//! per token:
//!
//! 1. Reject token counts outside the union of all target arities.
//! 2. Keep targets whose own arity covers the token count.
//! 3. Narrow each token to the parameter types the surviving targets accept
//!    at its position (string candidates always stay).
//! 4. Walk every candidate tuple depth first; at each leaf compare the tuple
//!    with each surviving target slot by slot, by exact type.
//! 5. The first full match wins. Without one, report the position where the
//!    longest matching prefix broke off.

use std::sync::Arc;

use conch_core::{ArgumentToken, CommandError, Value, ValueType};
use tracing::{debug, trace};

use crate::target::CommandTarget;

/// The chosen target and the values to call it with.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Index into the target list.
    pub target: usize,
    pub values: Vec<Value>,
}

/// Longest exact-type prefix seen so far.
#[derive(Debug, Clone, Copy)]
struct BestMatch {
    target: usize,
    prefix: usize,
}

pub struct OverloadResolver<'t> {
    targets: &'t [Arc<CommandTarget>],
}

impl<'t> OverloadResolver<'t> {
    pub fn new(targets: &'t [Arc<CommandTarget>]) -> Self {
        Self { targets }
    }

    /// Arity bounds over every target: `(min of mins, max of maxes)`.
    pub fn arity_bounds(&self) -> (usize, usize) {
        let min = self.targets.iter().map(|t| t.min_arity()).min().unwrap_or(0);
        let max = self.targets.iter().map(|t| t.max_arity()).max().unwrap_or(0);
        (min, max)
    }

    /// Resolves `tokens`, narrowing their candidates in place.
    pub fn resolve(&self, tokens: &mut [ArgumentToken]) -> Result<Resolution, CommandError> {
        let supplied = tokens.len();
        let (min, max) = self.arity_bounds();
        let mismatch = CommandError::ArgumentCountMismatch { supplied, min, max };
        if supplied < min || supplied > max {
            return Err(mismatch);
        }

        let surviving: Vec<usize> = self
            .targets
            .iter()
            .enumerate()
            .filter(|(_, t)| t.accepts(supplied))
            .map(|(i, _)| i)
            .collect();
        if surviving.is_empty() {
            return Err(mismatch);
        }

        for (position, token) in tokens.iter_mut().enumerate() {
            let accepted: Vec<ValueType> = surviving
                .iter()
                .filter_map(|&t| self.targets[t].parameter_types().get(position).copied())
                .collect();
            token.narrow(&accepted);
            trace!(
                position,
                text = token.text(),
                candidates = token.candidates().len(),
                "narrowed token"
            );
        }

        let mut values = Vec::with_capacity(supplied);
        let mut best = None;
        if let Some(target) = self.search(tokens, &surviving, &mut values, &mut best) {
            debug!(target, arguments = supplied, "resolved overload");
            return Ok(Resolution { target, values });
        }

        let (target, position) = match best {
            Some(BestMatch { target, prefix }) => (target, prefix),
            None => {
                let position = tokens
                    .iter()
                    .position(|t| t.candidates().is_empty())
                    .unwrap_or(0);
                (surviving[0], position)
            }
        };
        debug!(target, position, "no overload matched");
        Err(CommandError::ArgumentParseFailure {
            expected: self.targets[target].parameter_types()[position],
            literal: tokens[position].text().to_string(),
        })
    }

    fn search(
        &self,
        tokens: &[ArgumentToken],
        surviving: &[usize],
        values: &mut Vec<Value>,
        best: &mut Option<BestMatch>,
    ) -> Option<usize> {
        let depth = values.len();
        let Some(token) = tokens.get(depth) else {
            return self.match_tuple(values, surviving, best);
        };

        for candidate in token.candidates() {
            values.push(candidate.clone());
            if let Some(target) = self.search(tokens, surviving, values, best) {
                return Some(target);
            }
            values.pop();
        }
        None
    }

    fn match_tuple(
        &self,
        values: &[Value],
        surviving: &[usize],
        best: &mut Option<BestMatch>,
    ) -> Option<usize> {
        for &target in surviving {
            let parameters = self.targets[target].parameter_types();
            let prefix = values
                .iter()
                .zip(parameters)
                .take_while(|(value, ty)| value.value_type() == **ty)
                .count();

            if best.is_none_or(|b| prefix > b.prefix) {
                *best = Some(BestMatch { target, prefix });
            }
            if prefix == values.len() {
                return Some(target);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conch_core::ValueParserRegistry;

    fn targets(list: Vec<CommandTarget>) -> Vec<Arc<CommandTarget>> {
        list.into_iter().map(Arc::new).collect()
    }

    fn tokens(words: &[&str]) -> Vec<ArgumentToken> {
        let parsers = ValueParserRegistry::standard();
        words.iter().map(|w| parsers.parse_token(w)).collect()
    }

    #[test]
    fn test_int_target_takes_integer_candidate() {
        let targets = targets(vec![CommandTarget::function("f", |_: i32| ())]);
        let mut tokens = tokens(&["5"]);
        let resolution = OverloadResolver::new(&targets).resolve(&mut tokens).unwrap();
        assert_eq!(resolution.target, 0);
        assert_eq!(resolution.values, vec![Value::I32(5)]);
        assert_eq!(
            tokens[0].candidates(),
            &[Value::I32(5), Value::String("5".into())]
        );
    }

    #[test]
    fn test_registration_order_breaks_ties() {
        let targets = targets(vec![
            CommandTarget::function("f", |_: i32| ()),
            CommandTarget::function("f", |_: String| ()),
        ]);
        let resolution = OverloadResolver::new(&targets)
            .resolve(&mut tokens(&["5"]))
            .unwrap();
        assert_eq!(resolution.target, 0);

        let resolution = OverloadResolver::new(&targets)
            .resolve(&mut tokens(&["five"]))
            .unwrap();
        assert_eq!(resolution.target, 1);
        assert_eq!(resolution.values, vec![Value::from("five")]);
    }

    #[test]
    fn test_string_target_first_wins_even_for_numbers() {
        let targets = targets(vec![
            CommandTarget::function("f", |_: String| ()),
            CommandTarget::function("f", |_: i32| ()),
        ]);
        let resolution = OverloadResolver::new(&targets)
            .resolve(&mut tokens(&["5"]))
            .unwrap();
        assert_eq!(resolution.target, 1);
    }

    #[test]
    fn test_arity_boundaries() {
        let targets = targets(vec![CommandTarget::function(
            "f",
            |_: i32, _: Option<i32>| (),
        )]);
        let resolver = OverloadResolver::new(&targets);
        assert!(resolver.resolve(&mut tokens(&["1"])).is_ok());
        assert!(resolver.resolve(&mut tokens(&["1", "2"])).is_ok());
        for words in [&[][..], &["1", "2", "3"][..]] {
            match resolver.resolve(&mut tokens(words)) {
                Err(CommandError::ArgumentCountMismatch { min, max, .. }) => {
                    assert_eq!((min, max), (1, 2));
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn test_gap_between_target_arities() {
        let targets = targets(vec![
            CommandTarget::function("f", || ()),
            CommandTarget::function("f", |_: i32, _: i32| ()),
        ]);
        match OverloadResolver::new(&targets).resolve(&mut tokens(&["1"])) {
            Err(CommandError::ArgumentCountMismatch { supplied, min, max }) => {
                assert_eq!((supplied, min, max), (1, 0, 2));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_failure_names_longest_prefix() {
        let targets = targets(vec![
            CommandTarget::function("f", |_: bool, _: bool| ()),
            CommandTarget::function("f", |_: i32, _: i32| ()),
        ]);
        match OverloadResolver::new(&targets).resolve(&mut tokens(&["5", "x"])) {
            Err(CommandError::ArgumentParseFailure { expected, literal }) => {
                assert_eq!(expected, ValueType::I32);
                assert_eq!(literal, "x");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_failure_at_first_position() {
        let targets = targets(vec![CommandTarget::function("f", |_: u8| ())]);
        let err = OverloadResolver::new(&targets)
            .resolve(&mut tokens(&["300"]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Unable to parse '300' to u8");
    }

    #[test]
    fn test_zero_argument_target_matches() {
        let targets = targets(vec![CommandTarget::function("f", || ())]);
        let resolution = OverloadResolver::new(&targets).resolve(&mut []).unwrap();
        assert_eq!(resolution.target, 0);
        assert!(resolution.values.is_empty());
    }

    #[test]
    fn test_empty_candidates_report_that_position() {
        let targets = targets(vec![CommandTarget::function("f", |_: i32| ())]);
        let mut tokens = vec![ArgumentToken::new("?", Vec::new())];
        match OverloadResolver::new(&targets).resolve(&mut tokens) {
            Err(CommandError::ArgumentParseFailure { expected, literal }) => {
                assert_eq!(expected, ValueType::I32);
                assert_eq!(literal, "?");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let targets = targets(vec![
            CommandTarget::function("f", |_: f64, _: String| ()),
            CommandTarget::function("f", |_: i64, _: bool| ()),
        ]);
        let resolver = OverloadResolver::new(&targets);
        let mut tokens = tokens(&["3", "true"]);
        let first = resolver.resolve(&mut tokens).unwrap();
        let second = resolver.resolve(&mut tokens).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.target, 0);
        assert_eq!(first.values, vec![Value::F64(3.0), Value::from("true")]);
    }
}
