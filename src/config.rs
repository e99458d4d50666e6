//! Configuration management for nested-shell.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::command::{CommandResolver, DirectoryProvider, ModuleCatalog, ProviderChain};
use crate::logging::{DEBUG_FILTER, DEFAULT_FILTER};
use crate::session::{Clock, SessionManager, SessionRegistry, SystemClock, DEFAULT_PROMPT};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session configuration.
    pub shell: ShellSection,
    /// Core command module configuration.
    pub modules: ModulesSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Session configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSection {
    /// Prompt given to every new session.
    pub prompt: String,
}

impl Default for ShellSection {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

/// Core command module section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulesSection {
    /// Enable the modules compiled into the shell.
    pub builtin: bool,
    /// Directory of JSON command manifests.
    pub dir: Option<PathBuf>,
}

impl Default for ModulesSection {
    fn default() -> Self {
        Self {
            builtin: true,
            dir: None,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Tracing filter directive (e.g. `nested_shell=debug`).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: DEFAULT_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(prompt) = std::env::var("NESTED_SHELL_PROMPT") {
            self.shell.prompt = prompt;
        }

        if let Ok(dir) = std::env::var("NESTED_SHELL_MODULES") {
            if !dir.is_empty() {
                self.modules.dir = Some(PathBuf::from(dir));
            }
        }

        if let Ok(level) = std::env::var("NESTED_SHELL_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref prompt) = args.prompt {
            self.shell.prompt = prompt.clone();
        }

        if let Some(ref dir) = args.modules {
            self.modules.dir = Some(dir.clone());
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }

        if args.debug {
            self.logging.level = DEBUG_FILTER.to_string();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Build the provider chain for the core command tier.
    pub fn providers(&self, clock: Arc<dyn Clock>) -> ProviderChain {
        let mut chain = ProviderChain::new();
        if self.modules.builtin {
            chain = chain.with(ModuleCatalog::builtin_with_clock(clock));
        }
        if let Some(ref dir) = self.modules.dir {
            chain = chain.with(DirectoryProvider::new(dir));
        }
        chain
    }

    /// Build a session manager over a fresh registry.
    pub fn session_manager(&self) -> SessionManager {
        self.session_manager_with_clock(Arc::new(SystemClock))
    }

    /// Build a session manager whose sessions and `date` read `clock`.
    pub fn session_manager_with_clock(&self, clock: Arc<dyn Clock>) -> SessionManager {
        SessionManager::new(
            Arc::new(SessionRegistry::new()),
            CommandResolver::new(self.providers(Arc::clone(&clock))),
        )
        .with_clock(clock)
        .with_prompt(self.shell.prompt.as_str())
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.shell.prompt, ">> ");
        assert!(config.modules.builtin);
        assert!(config.modules.dir.is_none());
        assert_eq!(config.log_filter(), DEFAULT_FILTER);
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "shell": { "prompt": "$ " },
            "modules": { "builtin": false, "dir": "/opt/shell/modules" },
            "logging": { "level": "nested_shell=trace" }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.shell.prompt, "$ ");
        assert!(!config.modules.builtin);
        assert_eq!(config.modules.dir, Some(PathBuf::from("/opt/shell/modules")));
        assert_eq!(config.log_filter(), "nested_shell=trace");
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{ "modules": { "dir": "mods" } }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.shell.prompt, ">> "); // Default
        assert!(config.modules.builtin); // Default
        assert_eq!(config.modules.dir, Some(PathBuf::from("mods")));
    }

    #[test]
    fn test_config_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ prompt").unwrap();

        let result = Config::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_config_missing_file() {
        let result = Config::from_file(Path::new("/nonexistent/nested-shell.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        let args = Args {
            prompt: Some("% ".to_string()),
            modules: Some(PathBuf::from("/tmp/mods")),
            log_level: Some("nested_shell=info".to_string()),
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.shell.prompt, "% ");
        assert_eq!(config.modules.dir, Some(PathBuf::from("/tmp/mods")));
        assert_eq!(config.log_filter(), "nested_shell=info");
    }

    #[test]
    fn test_debug_overrides_level() {
        let mut config = Config::default();
        let args = Args {
            log_level: Some("nested_shell=error".to_string()),
            debug: true,
            ..Args::default()
        };

        config.apply_args(&args);
        assert_eq!(config.log_filter(), DEBUG_FILTER);
    }

    #[test]
    fn test_providers_follow_sections() {
        let mut config = Config::default();
        assert_eq!(config.providers(Arc::new(SystemClock)).len(), 1);

        config.modules.dir = Some(PathBuf::from("/tmp"));
        assert_eq!(config.providers(Arc::new(SystemClock)).len(), 2);

        config.modules.builtin = false;
        config.modules.dir = None;
        assert!(config.providers(Arc::new(SystemClock)).is_empty());
    }

    #[test]
    fn test_session_manager_uses_prompt() {
        let mut config = Config::default();
        config.shell.prompt = "# ".to_string();
        assert_eq!(config.session_manager().default_prompt(), "# ");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"prompt\""));
        assert!(json.contains("\"builtin\""));
    }
}
