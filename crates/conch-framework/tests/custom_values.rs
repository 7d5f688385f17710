//! User-defined value types registered from outside `conch-core`.

use std::fmt;
use std::sync::Arc;

use conch_core::{ArgType, MemorySink, Value, ValueParserRegistry, ValueType};
use conch_framework::{
    CommandRegistry, CommandTarget, ConsoleConfig, ConsoleSession, LineParser, ShellLineParser,
};

#[derive(Debug, Clone, PartialEq)]
struct Color(u32);

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}

conch_core::custom_value!(Color);

fn color_parser() -> ShellLineParser {
    let mut values = ValueParserRegistry::standard();
    values.register_fn::<Color, _>(|text| {
        let hex = text.strip_prefix('#')?;
        u32::from_str_radix(hex, 16).ok().map(|rgb| Value::from(Color(rgb)))
    });
    ShellLineParser::new(values)
}

fn session(registry: CommandRegistry) -> (ConsoleSession, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::default());
    let session = ConsoleSession::builder()
        .registry(registry)
        .parser(Arc::new(color_parser()))
        .sink(sink.clone())
        .config(ConsoleConfig {
            include_stack_trace_in_command_errors: false,
            ..ConsoleConfig::default()
        })
        .build();
    (session, sink)
}

#[test]
fn custom_candidates_come_before_the_string_fallback() {
    let tokens = color_parser().parse_line("paint #7");
    let types: Vec<_> = tokens[1].candidates().iter().map(Value::value_type).collect();
    assert_eq!(types, vec![<Color as ArgType>::value_type(), ValueType::String]);
    assert_eq!(tokens[1].candidates()[0].clone().get::<Color>(), Some(Color(7)));
}

#[test]
fn target_with_a_custom_parameter_dispatches() {
    let mut registry = CommandRegistry::new();
    registry.add_target(CommandTarget::function("paint", |c: Color| format!("painted {c}")));
    let (mut session, sink) = session(registry);

    assert_eq!(
        session.execute("paint #7").into_value(),
        Some(Value::from("painted #7"))
    );
    assert!(session.execute("paint red").is_failed());
    assert_eq!(sink.messages().last().map(String::as_str), Some("Unable to parse 'red' to Color"));
}

#[test]
fn optional_custom_parameter_and_custom_return_value() {
    let mut registry = CommandRegistry::new();
    registry.add_target(CommandTarget::function("mix", |base: Color, tint: Option<Color>| {
        Color(base.0 | tint.map_or(0, |t| t.0))
    }));
    let (mut session, _sink) = session(registry);

    let mixed = session.execute("mix #f0 #0f").into_value();
    assert_eq!(mixed.and_then(Value::get::<Color>), Some(Color(0xff)));
    let plain = session.execute("mix #10").into_value();
    assert_eq!(plain.and_then(Value::get::<Color>), Some(Color(0x10)));
}
