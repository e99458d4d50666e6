//! Command-line interface for nested-shell.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Prompt for new sessions (overrides config file).
    pub prompt: Option<String>,
    /// Directory of command manifests (overrides config file).
    pub modules: Option<PathBuf>,
    /// Log filter (error, warn, info, debug, trace or a directive).
    pub log_level: Option<String>,
    /// Enable debug logging.
    pub debug: bool,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('p') | Long("prompt") => {
                result.prompt = Some(parser.value()?.parse()?);
            }
            Short('m') | Long("modules") => {
                result.modules = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                let value: String = parser.value()?.parse()?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidValue("log-level", value));
                }
                result.log_level = Some(value);
            }
            Short('d') | Long("debug") => {
                result.debug = true;
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"nested-shell {version}
Interactive command interpreter with nested sessions

USAGE:
    nested-shell [OPTIONS]

OPTIONS:
    -c, --config <FILE>     Path to configuration file (JSON)
    -p, --prompt <TEXT>     Prompt for new shells [default: ">> "]
    -m, --modules <DIR>     Directory of command manifests (<name>.json)
    -l, --log-level <LVL>   Log filter (error, warn, info, debug, trace)
    -d, --debug             Enable debug logging
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    NESTED_SHELL_PROMPT     Prompt (overrides config)
    NESTED_SHELL_MODULES    Manifest directory (overrides config)
    NESTED_SHELL_LOG_LEVEL  Log filter (overrides config)
    RUST_LOG                Alternative log filter setting

Logs are written to stderr.

EXAMPLES:
    # Start with defaults
    nested-shell

    # Load extra commands from a directory
    nested-shell -m ~/.config/nested-shell/modules

    # Trace command resolution
    nested-shell --debug
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("nested-shell {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("nested-shell")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert!(result.config.is_none());
        assert!(result.prompt.is_none());
        assert!(!result.debug);
    }

    #[test]
    fn test_short_options() {
        let result = parse_args_from(args(&["-p", "$ ", "-m", "/tmp/mods"])).unwrap();
        assert_eq!(result.prompt, Some("$ ".to_string()));
        assert_eq!(result.modules, Some(PathBuf::from("/tmp/mods")));
    }

    #[test]
    fn test_long_options() {
        let result =
            parse_args_from(args(&["--prompt", "% ", "--config", "/etc/nested.json"])).unwrap();
        assert_eq!(result.prompt, Some("% ".to_string()));
        assert_eq!(result.config, Some(PathBuf::from("/etc/nested.json")));
    }

    #[test]
    fn test_debug_flag() {
        assert!(parse_args_from(args(&["-d"])).unwrap().debug);
        assert!(parse_args_from(args(&["--debug"])).unwrap().debug);
    }

    #[test]
    fn test_help_flag() {
        assert!(parse_args_from(args(&["-h"])).unwrap().help);
        assert!(parse_args_from(args(&["--help"])).unwrap().help);
    }

    #[test]
    fn test_version_flag() {
        assert!(parse_args_from(args(&["-V"])).unwrap().version);
        assert!(parse_args_from(args(&["--version"])).unwrap().version);
    }

    #[test]
    fn test_log_level() {
        let result = parse_args_from(args(&["-l", "debug"])).unwrap();
        assert_eq!(result.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_empty_log_level_rejected() {
        let result = parse_args_from(args(&["-l", " "]));
        assert!(matches!(result, Err(ArgsError::InvalidValue("log-level", _))));
    }

    #[test]
    fn test_positional_rejected() {
        let result = parse_args_from(args(&["script.nsh"]));
        assert!(matches!(result, Err(ArgsError::UnexpectedArgument(_))));
    }

    #[test]
    fn test_unknown_option_rejected() {
        let result = parse_args_from(args(&["--port", "3000"]));
        assert!(matches!(result, Err(ArgsError::Lexopt(_))));
    }

    #[test]
    fn test_missing_value() {
        assert!(parse_args_from(args(&["--prompt"])).is_err());
    }
}
