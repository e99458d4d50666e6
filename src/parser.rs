//! Input line tokenizing and flag parsing.
//!
//! A line is split into words with shell-style quoting, then each word is
//! classified as a flag or a positional argument:
//!
//! - `--name=value` sets `name` to a number or text value
//! - `--name` sets `name` to `true`, `--no-name` sets it to `false`
//! - `-abc` sets `a`, `b` and `c` to `true`
//! - everything after a bare `--` is positional
//!
//! Parsing never fails. Unbalanced quotes fall back to whitespace splitting,
//! and anything that does not look like a well-formed flag (`-`, `---x`,
//! `--=v`, `-5`) is kept as a positional argument.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Value attached to a flag.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    /// Presence switch (`--name`, `-n`) or its negation (`--no-name`).
    Switch(bool),
    /// Numeric value (`--count=3`).
    Number(f64),
    /// Any other value (`--name=alice`).
    Text(String),
}

impl FlagValue {
    fn from_value(raw: &str) -> Self {
        if looks_numeric(raw) {
            if let Some(n) = raw.parse::<f64>().ok().filter(|n| n.is_finite()) {
                return FlagValue::Number(n);
            }
        }
        FlagValue::Text(raw.to_string())
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Switch(b) => write!(f, "{}", b),
            FlagValue::Number(n) => write!(f, "{}", n),
            FlagValue::Text(s) => f.write_str(s),
        }
    }
}

/// Arguments handed to a command, with the command name already removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs {
    /// Positional arguments in input order.
    pub positional: Vec<String>,
    /// Flags by name; a repeated flag keeps its last value.
    pub flags: BTreeMap<String, FlagValue>,
}

impl ParsedArgs {
    /// Look up a flag.
    pub fn flag(&self, name: &str) -> Option<&FlagValue> {
        self.flags.get(name)
    }

    /// Whether a flag was given as a `true` switch.
    pub fn is_set(&self, name: &str) -> bool {
        matches!(self.flags.get(name), Some(FlagValue::Switch(true)))
    }

    /// Whether there are neither positionals nor flags.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.flags.is_empty()
    }
}

/// A tokenized input line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLine {
    /// First positional word, or empty when the line has none.
    pub command: String,
    /// Remaining arguments.
    pub args: ParsedArgs,
}

impl ParsedLine {
    /// Whether the line named no command.
    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }
}

/// Parse one line of input.
pub fn parse_line(line: &str) -> ParsedLine {
    let mut args = parse_words(split_words(line.trim()));
    let command = if args.positional.is_empty() {
        String::new()
    } else {
        args.positional.remove(0)
    };

    ParsedLine { command, args }
}

fn split_words(line: &str) -> Vec<String> {
    shlex::split(&escape_comment_marks(line))
        .unwrap_or_else(|| line.split_whitespace().map(String::from).collect())
}

/// Escape every unquoted `#` that starts a word.
///
/// shlex drops such a word and the rest of the line as a comment; here
/// `#` is an ordinary character.
fn escape_comment_marks(line: &str) -> Cow<'_, str> {
    if !line.contains('#') {
        return Cow::Borrowed(line);
    }

    let mut out = String::with_capacity(line.len() + 2);
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut word_start = true;

    for c in line.chars() {
        if escaped {
            escaped = false;
            word_start = false;
            out.push(c);
            continue;
        }
        match quote {
            Some(q) if c == q => quote = None,
            Some('"') if c == '\\' => escaped = true,
            Some(_) => {}
            None => match c {
                '\\' => escaped = true,
                '\'' | '"' => quote = Some(c),
                '#' if word_start => out.push('\\'),
                _ => {}
            },
        }
        word_start = quote.is_none() && !escaped && c.is_whitespace();
        out.push(c);
    }

    Cow::Owned(out)
}

fn parse_words(words: Vec<String>) -> ParsedArgs {
    let mut args = ParsedArgs::default();
    let mut rest_positional = false;

    for word in words {
        if rest_positional {
            args.positional.push(word);
        } else if word == "--" {
            rest_positional = true;
        } else if let Some(body) = word.strip_prefix("--") {
            match long_flag(body) {
                Some((name, value)) => {
                    args.flags.insert(name, value);
                }
                None => args.positional.push(word),
            }
        } else if let Some(body) = word.strip_prefix('-') {
            if !body.is_empty()
                && !looks_numeric(&word)
                && body.chars().all(|c| c.is_ascii_alphabetic())
            {
                for c in body.chars() {
                    args.flags.insert(c.to_string(), FlagValue::Switch(true));
                }
            } else {
                args.positional.push(word);
            }
        } else {
            args.positional.push(word);
        }
    }

    args
}

fn long_flag(body: &str) -> Option<(String, FlagValue)> {
    if let Some((name, value)) = body.split_once('=') {
        return valid_flag_name(name).then(|| (name.to_string(), FlagValue::from_value(value)));
    }
    if !valid_flag_name(body) {
        return None;
    }
    match body.strip_prefix("no-") {
        Some(negated) if valid_flag_name(negated) => {
            Some((negated.to_string(), FlagValue::Switch(false)))
        }
        _ => Some((body.to_string(), FlagValue::Switch(true))),
    }
}

fn valid_flag_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn looks_numeric(raw: &str) -> bool {
    let body = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    matches!(body.chars().next(), Some(c) if c.is_ascii_digit() || c == '.')
}
