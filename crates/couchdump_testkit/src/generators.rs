//! Property-based test generators using proptest.
//!
//! Provides strategies for command-line token lists that the argument
//! parser accepts without ambiguity: flags never precede a value token,
//! value options always get a value, and positionals after the options
//! never start with a dash.

use proptest::prelude::*;

/// Option names the generated token lists declare as requiring a value.
pub const VALUE_OPTIONS: &[&str] = &["H", "p", "d", "f", "host"];

/// Option names the generated token lists declare as repeatable.
pub const REPEATABLE_OPTIONS: &[&str] = &["tag", "f"];

/// One generated argument before it is turned into tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgItem {
    /// `-name` or `--name`, never a value option.
    Flag {
        /// Option name.
        name: String,
        /// Use the `--` prefix.
        long: bool,
    },
    /// `--name=value`.
    Inline {
        /// Option name.
        name: String,
        /// Inline value, may contain `=`.
        value: String,
    },
    /// `-name value` for a value option.
    Separate {
        /// One of [`VALUE_OPTIONS`].
        name: String,
        /// Next token, may start with a dash.
        value: String,
    },
    /// A token not starting with a dash.
    Positional(String),
}

impl ArgItem {
    /// Appends this item's tokens.
    pub fn push_tokens(&self, out: &mut Vec<String>) {
        match self {
            ArgItem::Flag { name, long: true } => out.push(format!("--{name}")),
            ArgItem::Flag { name, long: false } => out.push(format!("-{name}")),
            ArgItem::Inline { name, value } => out.push(format!("--{name}={value}")),
            ArgItem::Separate { name, value } => {
                out.push(format!("-{name}"));
                out.push(value.clone());
            }
            ArgItem::Positional(token) => out.push(token.clone()),
        }
    }
}

/// Strategy for option names, biased towards the declared ones.
pub fn option_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(VALUE_OPTIONS).prop_map(str::to_string),
        prop::sample::select(REPEATABLE_OPTIONS).prop_map(str::to_string),
        prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,7}").expect("Invalid regex"),
    ]
}

/// Strategy for option values; anything printable, including dashes and `=`.
pub fn option_value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ -~]{0,12}").expect("Invalid regex")
}

/// Strategy for positionals that cannot be mistaken for options.
pub fn positional_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9._/][a-zA-Z0-9._/=-]{0,11}").expect("Invalid regex")
}

/// Strategy for single argument items.
pub fn arg_item_strategy() -> impl Strategy<Value = ArgItem> {
    prop_oneof![
        (option_name_strategy(), any::<bool>())
            .prop_filter("flags must not take a value", |(name, _)| {
                !VALUE_OPTIONS.contains(&name.as_str())
            })
            .prop_map(|(name, long)| ArgItem::Flag { name, long }),
        (option_name_strategy(), option_value_strategy())
            .prop_map(|(name, value)| ArgItem::Inline { name, value }),
        (prop::sample::select(VALUE_OPTIONS), option_value_strategy()).prop_map(
            |(name, value)| ArgItem::Separate {
                name: name.to_string(),
                value,
            }
        ),
        positional_strategy().prop_map(ArgItem::Positional),
    ]
}

/// Strategy for whole argument lists: a run of items, optionally followed
/// by `--` and a verbatim tail.
pub fn arg_list_strategy() -> impl Strategy<Value = Vec<String>> {
    (
        prop::collection::vec(arg_item_strategy(), 0..12),
        prop::option::of(prop::collection::vec(option_value_strategy(), 0..4)),
    )
        .prop_map(|(items, tail)| {
            let mut tokens = Vec::new();
            for item in &items {
                item.push_tokens(&mut tokens);
            }
            if let Some(tail) = tail {
                tokens.push("--".to_string());
                tokens.extend(tail);
            }
            tokens
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn positionals_never_look_like_options(token in positional_strategy()) {
            prop_assert!(!token.starts_with('-'));
        }

        #[test]
        fn flags_are_never_value_options(item in arg_item_strategy()) {
            if let ArgItem::Flag { name, .. } = item {
                prop_assert!(!VALUE_OPTIONS.contains(&name.as_str()));
            }
        }
    }

    #[test]
    fn separate_items_produce_two_tokens() {
        let mut tokens = Vec::new();
        ArgItem::Separate {
            name: "d".into(),
            value: "-x".into(),
        }
        .push_tokens(&mut tokens);
        assert_eq!(tokens, vec!["-d", "-x"]);
    }
}
