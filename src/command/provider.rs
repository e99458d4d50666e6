//! Core command providers.
//!
//! A [`CommandProvider`] turns a command name into a loaded
//! [`CommandModule`]. The two outcomes besides success are kept apart:
//! [`LoadError::Absent`] means there is no such module and resolution moves
//! on, while [`LoadError::Failed`] means the module exists but could not be
//! brought up, which is reported to the user.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::module::{CommandModule, Date, Echo, ModuleError};
use crate::parser::ParsedArgs;
use crate::session::{Clock, SystemClock};
use crate::terminal::LineSink;

/// Why a module could not be loaded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// No module with this name exists.
    #[error("module not found")]
    Absent,

    /// The module exists but failed to load or initialize.
    #[error("{0}")]
    Failed(String),
}

/// Loads core command modules by name.
#[async_trait]
pub trait CommandProvider: Send + Sync {
    /// Attempt to load the module called `name`.
    async fn try_load(&self, name: &str) -> Result<Arc<dyn CommandModule>, LoadError>;
}

/// Constructor for a catalog entry; may fail during initialization.
pub type ModuleFactory = Arc<dyn Fn() -> Result<Arc<dyn CommandModule>, String> + Send + Sync>;

/// In-process registry of module factories.
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    factories: BTreeMap<String, ModuleFactory>,
}

impl fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl ModuleCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the modules compiled into the shell: `echo` and `date`.
    pub fn builtin() -> Self {
        Self::builtin_with_clock(Arc::new(SystemClock))
    }

    /// Built-in catalog whose `date` reads `clock`.
    pub fn builtin_with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::new()
            .with("echo", || Ok(Arc::new(Echo) as Arc<dyn CommandModule>))
            .with("date", move || {
                Ok(Arc::new(Date::new(Arc::clone(&clock))) as Arc<dyn CommandModule>)
            })
    }

    /// Add or replace a module factory.
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn CommandModule>, String> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Names of all cataloged modules, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[async_trait]
impl CommandProvider for ModuleCatalog {
    async fn try_load(&self, name: &str) -> Result<Arc<dyn CommandModule>, LoadError> {
        let factory = self.factories.get(name).ok_or(LoadError::Absent)?;
        factory().map_err(LoadError::Failed)
    }
}

/// On-disk description of a directory module.
#[derive(Debug, Clone, Deserialize)]
struct Manifest {
    #[serde(default)]
    description: String,
    lines: Vec<String>,
}

/// Loads modules from `<dir>/<name>.json` manifests.
///
/// A manifest lists output lines; `$1`..`$9` are replaced by the matching
/// positional argument and `$@` by all of them.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    dir: PathBuf,
}

impl DirectoryProvider {
    /// Create a provider reading manifests from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The manifest directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn manifest_path(&self, name: &str) -> Option<PathBuf> {
        let plain = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && !name.contains('\0');
        plain.then(|| self.dir.join(format!("{}.json", name)))
    }
}

#[async_trait]
impl CommandProvider for DirectoryProvider {
    async fn try_load(&self, name: &str) -> Result<Arc<dyn CommandModule>, LoadError> {
        let path = self.manifest_path(name).ok_or(LoadError::Absent)?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(LoadError::Absent),
            Err(e) => {
                return Err(LoadError::Failed(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let manifest: Manifest = serde_json::from_str(&content).map_err(|e| {
            LoadError::Failed(format!("malformed manifest {}: {}", path.display(), e))
        })?;

        debug!("loaded module {} from {}", name, path.display());
        Ok(Arc::new(TemplateModule { manifest }))
    }
}

/// Module built from a directory manifest.
struct TemplateModule {
    manifest: Manifest,
}

#[async_trait]
impl CommandModule for TemplateModule {
    fn description(&self) -> &str {
        &self.manifest.description
    }

    async fn run(&self, args: &ParsedArgs, out: &mut dyn LineSink) -> Result<(), ModuleError> {
        for line in &self.manifest.lines {
            out.write_line(&expand_template(line, &args.positional));
        }
        Ok(())
    }
}

fn expand_template(template: &str, positional: &[String]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('@') => {
                chars.next();
                result.push_str(&positional.join(" "));
            }
            Some(d @ '1'..='9') => {
                chars.next();
                let index = d as usize - '1' as usize;
                if let Some(arg) = positional.get(index) {
                    result.push_str(arg);
                }
            }
            _ => result.push('$'),
        }
    }

    result
}

/// Tries several providers in order.
///
/// `Absent` from one provider moves on to the next; `Failed` stops the
/// search and is returned as is.
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn CommandProvider>>,
}

impl ProviderChain {
    /// Create an empty chain; it reports every name as absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider.
    pub fn with(mut self, provider: impl CommandProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the chain has no providers.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl CommandProvider for ProviderChain {
    async fn try_load(&self, name: &str) -> Result<Arc<dyn CommandModule>, LoadError> {
        for provider in &self.providers {
            match provider.try_load(name).await {
                Err(LoadError::Absent) => continue,
                other => return other,
            }
        }
        Err(LoadError::Absent)
    }
}
