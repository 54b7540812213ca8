//! Command-line argument parsing.
//!
//! Grammar:
//!
//! - `-name` and `--name` are options; `--name=value` carries an inline value.
//! - An option declared as requiring a value consumes the next token when no
//!   inline value was given. If there is no next token the value is
//!   [`OptionValue::Missing`].
//! - Options declared as repeatable accumulate into
//!   [`OptionValue::Repeated`]; all others are overwritten by later
//!   occurrences.
//! - A bare `--` ends option parsing; the rest are positionals verbatim.
//! - `-` and anything not starting with `-` are positionals.

use crate::error::{CoreError, CoreResult};
use std::collections::BTreeMap;

/// The value recorded for one option name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Present without a value.
    Flag,
    /// Present with a value.
    Value(String),
    /// Declared as requiring a value, but the argument list ended.
    Missing,
    /// Every occurrence of a repeatable option, in order.
    Repeated(Vec<OptionValue>),
}

impl OptionValue {
    fn push(&mut self, value: OptionValue) {
        match self {
            OptionValue::Repeated(values) => values.push(value),
            single => {
                let first = std::mem::replace(single, OptionValue::Missing);
                *single = OptionValue::Repeated(vec![first, value]);
            }
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Result of parsing an argument list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    options: BTreeMap<String, OptionValue>,
    positionals: Vec<String>,
}

/// Parses `args` (without the program name).
///
/// `requires_value` lists option names that take the next token as their
/// value; `repeatable` lists option names that may occur more than once.
pub fn parse_args<S: AsRef<str>>(
    args: &[S],
    requires_value: &[&str],
    repeatable: &[&str],
) -> ParsedArgs {
    let mut parsed = ParsedArgs::default();
    let mut cursor = 0;

    while cursor < args.len() {
        let token = args[cursor].as_ref();
        cursor += 1;

        if token == "--" {
            parsed
                .positionals
                .extend(args[cursor..].iter().map(|a| a.as_ref().to_string()));
            break;
        }
        if token == "-" || !token.starts_with('-') {
            parsed.positionals.push(token.to_string());
            continue;
        }

        let (name, mut value) = split_option(token);
        if value == OptionValue::Flag && requires_value.contains(&name) {
            value = match args.get(cursor) {
                Some(next) => {
                    cursor += 1;
                    OptionValue::Value(next.as_ref().to_string())
                }
                None => OptionValue::Missing,
            };
        }

        if repeatable.contains(&name) {
            if let Some(existing) = parsed.options.get_mut(name) {
                existing.push(value);
                continue;
            }
        }
        parsed.options.insert(name.to_string(), value);
    }

    parsed
}

fn split_option(token: &str) -> (&str, OptionValue) {
    let name = &token[1..];
    match name.strip_prefix('-') {
        Some(long) => match long.split_once('=') {
            Some((name, value)) => (name, OptionValue::Value(value.to_string())),
            None => (long, OptionValue::Flag),
        },
        None => (name, OptionValue::Flag),
    }
}

impl ParsedArgs {
    /// Returns the raw value recorded for an option.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    /// Returns true if the option occurred at all, whatever its value.
    pub fn is_set(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    /// Returns true if the option occurred and did not end up
    /// [`OptionValue::Missing`].
    pub fn is_enabled(&self, name: &str) -> bool {
        !matches!(self.get(name), None | Some(OptionValue::Missing))
    }

    /// Returns the string value of an option.
    ///
    /// `Ok(None)` means the option was not given. An option given without a
    /// value is a usage error. For repeated options the last occurrence wins.
    pub fn value(&self, name: &str) -> CoreResult<Option<&str>> {
        let value = match self.get(name) {
            None => return Ok(None),
            Some(OptionValue::Repeated(values)) => values.last(),
            Some(value) => Some(value),
        };
        value
            .and_then(OptionValue::as_str)
            .map(Some)
            .ok_or_else(|| CoreError::MissingValue {
                option: name.to_string(),
            })
    }

    /// Returns every value of a repeatable option.
    pub fn values(&self, name: &str) -> CoreResult<Vec<&str>> {
        let occurrences = match self.get(name) {
            None => return Ok(Vec::new()),
            Some(OptionValue::Repeated(values)) => values.iter().collect::<Vec<_>>(),
            Some(value) => vec![value],
        };
        occurrences
            .into_iter()
            .map(|value| {
                value.as_str().ok_or_else(|| CoreError::MissingValue {
                    option: name.to_string(),
                })
            })
            .collect()
    }

    /// Returns the positional arguments in order.
    pub fn positionals(&self) -> &[String] {
        &self.positionals
    }

    /// Iterates over options in name order.
    pub fn options(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Renders the parse result back into an argument list.
    ///
    /// Values become `--name=value`, flags `--name`, and positionals follow
    /// a `--` separator. Names containing `=` can only come from single-dash
    /// tokens, so they are rendered as `-name` with any value as the next
    /// token. Re-parsing the rendering with the same declarations
    /// yields an equal result as long as no option is
    /// [`OptionValue::Missing`].
    pub fn to_args(&self) -> Vec<String> {
        let mut rendered = Vec::new();
        for (name, value) in &self.options {
            render_option(name, value, &mut rendered);
        }
        if !self.positionals.is_empty() {
            rendered.push("--".to_string());
            rendered.extend(self.positionals.iter().cloned());
        }
        rendered
    }
}

fn render_option(name: &str, value: &OptionValue, out: &mut Vec<String>) {
    let single_dash = name.contains('=');
    match value {
        OptionValue::Value(value) if single_dash => {
            out.push(format!("-{name}"));
            out.push(value.clone());
        }
        OptionValue::Value(value) => out.push(format!("--{name}={value}")),
        OptionValue::Flag | OptionValue::Missing if single_dash => out.push(format!("-{name}")),
        OptionValue::Flag | OptionValue::Missing => out.push(format!("--{name}")),
        OptionValue::Repeated(values) => {
            for value in values {
                render_option(name, value, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ParsedArgs {
        parse_args(args, &["H", "p", "d", "f", "opt"], &["tag"])
    }

    #[test]
    fn short_options_with_values() {
        let parsed = parse(&["-H", "db.local", "-p", "5985", "-d", "test", "-e"]);

        assert_eq!(parsed.value("H").unwrap(), Some("db.local"));
        assert_eq!(parsed.value("p").unwrap(), Some("5985"));
        assert_eq!(parsed.value("d").unwrap(), Some("test"));
        assert_eq!(parsed.get("e"), Some(&OptionValue::Flag));
        assert!(parsed.positionals().is_empty());
    }

    #[test]
    fn inline_and_separate_values_match() {
        let inline = parse(&["--opt=val"]);
        let separate = parse(&["-opt", "val"]);
        assert_eq!(inline, separate);
        assert_eq!(inline.value("opt").unwrap(), Some("val"));
    }

    #[test]
    fn inline_value_splits_at_first_equals() {
        let parsed = parse(&["--d=a=b", "--x="]);
        assert_eq!(parsed.value("d").unwrap(), Some("a=b"));
        assert_eq!(parsed.value("x").unwrap(), Some(""));
    }

    #[test]
    fn single_dash_never_splits() {
        let parsed = parse(&["-x=y"]);
        assert_eq!(parsed.get("x=y"), Some(&OptionValue::Flag));
    }

    #[test]
    fn required_value_consumes_option_looking_token() {
        let parsed = parse(&["-d", "-e"]);
        assert_eq!(parsed.value("d").unwrap(), Some("-e"));
        assert!(!parsed.is_set("e"));
    }

    #[test]
    fn required_value_at_end_is_missing() {
        let parsed = parse(&["-e", "-d"]);
        assert_eq!(parsed.get("d"), Some(&OptionValue::Missing));
        assert!(parsed.is_set("d"));
        assert!(!parsed.is_enabled("d"));
        assert!(matches!(
            parsed.value("d"),
            Err(CoreError::MissingValue { ref option }) if option == "d"
        ));
    }

    #[test]
    fn flag_for_value_option_is_missing_value() {
        let parsed = parse(&["--verbose"]);
        assert!(parsed.is_enabled("verbose"));
        assert!(parsed.value("verbose").is_err());
    }

    #[test]
    fn double_dash_stops_parsing() {
        let parsed = parse(&["-e", "--", "-d", "--x=1", "--", "plain"]);
        assert!(!parsed.is_set("d"));
        assert_eq!(parsed.positionals(), &["-d", "--x=1", "--", "plain"]);
    }

    #[test]
    fn positionals_keep_order() {
        let parsed = parse(&["one", "-e", "-", "two"]);
        assert_eq!(parsed.positionals(), &["one", "-", "two"]);
    }

    #[test]
    fn repeatable_options_accumulate() {
        let parsed = parse(&["--tag=a", "-e", "--tag", "--tag=c"]);
        assert_eq!(
            parsed.get("tag"),
            Some(&OptionValue::Repeated(vec![
                OptionValue::Value("a".into()),
                OptionValue::Flag,
                OptionValue::Value("c".into()),
            ]))
        );
        assert!(parsed.values("tag").is_err());

        let parsed = parse(&["--tag=a", "--tag=b"]);
        assert_eq!(parsed.values("tag").unwrap(), vec!["a", "b"]);
        assert_eq!(parsed.value("tag").unwrap(), Some("b"));
    }

    #[test]
    fn non_repeatable_options_overwrite() {
        let parsed = parse(&["-d", "first", "-d", "second"]);
        assert_eq!(parsed.value("d").unwrap(), Some("second"));
        assert_eq!(parsed.values("d").unwrap(), vec!["second"]);
    }

    #[test]
    fn rendering_round_trips() {
        let parsed = parse(&["-d", "db", "-e", "--tag=a", "--tag=b", "pos", "--", "-h"]);
        let rendered = parsed.to_args();
        assert_eq!(
            rendered,
            vec!["--d=db", "--e", "--tag=a", "--tag=b", "--", "pos", "-h"]
        );
        assert_eq!(parse(&rendered.iter().map(String::as_str).collect::<Vec<_>>()), parsed);
    }

    #[test]
    fn names_with_equals_render_single_dash() {
        let parsed = parse(&["-x=y", "-e"]);
        let rendered = parsed.to_args();
        assert_eq!(rendered, vec!["--e", "-x=y"]);
        assert_eq!(parse(&rendered.iter().map(String::as_str).collect::<Vec<_>>()), parsed);

        let parsed = parse_args(&["-a=b", "value"][..], &["a=b"], &[]);
        let rendered = parsed.to_args();
        assert_eq!(rendered, vec!["-a=b", "value"]);
        assert_eq!(parse_args(rendered.as_slice(), &["a=b"], &[]), parsed);
    }

    #[test]
    fn empty_input() {
        let parsed = parse(&[]);
        assert_eq!(parsed, ParsedArgs::default());
        assert!(parsed.to_args().is_empty());
    }
}
