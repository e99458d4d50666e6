//! Command name resolution.
//!
//! Names are resolved in a fixed order: internal commands, then core
//! modules from the [`CommandProvider`], then the [`ExternalLookup`] tier.
//! A name nothing claims resolves to [`CommandKind::Unresolved`]. A core
//! module that exists but fails to load is an error, not "unresolved".

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::internal::InternalCommand;
use super::module::CommandModule;
use super::provider::{CommandProvider, LoadError, ModuleCatalog};
use crate::error::ShellError;
use crate::Result;

/// Which tier resolved a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Internal,
    Core,
    External,
    Unresolved,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CommandKind::Internal => "internal",
            CommandKind::Core => "core",
            CommandKind::External => "external",
            CommandKind::Unresolved => "not found",
        };
        f.write_str(label)
    }
}

/// Something that can be executed.
#[derive(Clone)]
pub enum Handler {
    /// Built-in command, run by the REPL itself.
    Internal(InternalCommand),
    /// Loaded module.
    Module(Arc<dyn CommandModule>),
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Internal(cmd) => f.debug_tuple("Internal").field(cmd).finish(),
            Handler::Module(module) => f
                .debug_tuple("Module")
                .field(&module.description())
                .finish(),
        }
    }
}

/// Result of resolving one command name.
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    /// The name as typed.
    pub name: String,
    /// Which tier claimed it.
    pub kind: CommandKind,
    /// What to run; `None` exactly when `kind` is `Unresolved`.
    pub handler: Option<Handler>,
}

impl CommandDescriptor {
    fn resolved(name: &str, kind: CommandKind, handler: Handler) -> Self {
        Self {
            name: name.to_string(),
            kind,
            handler: Some(handler),
        }
    }

    fn unresolved(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: CommandKind::Unresolved,
            handler: None,
        }
    }

    /// Whether any tier claimed the name.
    pub fn is_resolved(&self) -> bool {
        self.handler.is_some()
    }
}

/// Resolution tier for commands that live outside the shell.
///
/// No lookup mechanism ships yet; [`NoExternal`] reports every name as
/// not found.
pub trait ExternalLookup: Send + Sync {
    /// Find an external command called `name`.
    fn find(&self, name: &str) -> Option<Arc<dyn CommandModule>>;
}

/// External tier that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExternal;

impl ExternalLookup for NoExternal {
    fn find(&self, _name: &str) -> Option<Arc<dyn CommandModule>> {
        None
    }
}

/// Maps command names to handlers.
#[derive(Clone)]
pub struct CommandResolver {
    provider: Arc<dyn CommandProvider>,
    external: Arc<dyn ExternalLookup>,
}

impl CommandResolver {
    /// Create a resolver over `provider` with no external tier.
    pub fn new(provider: impl CommandProvider + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
            external: Arc::new(NoExternal),
        }
    }

    /// Replace the external tier.
    pub fn with_external(mut self, external: impl ExternalLookup + 'static) -> Self {
        self.external = Arc::new(external);
        self
    }

    /// Resolve `name` to a command.
    ///
    /// Fails only with `CommandLoadFailure`, when a core module exists but
    /// cannot be loaded. An unknown name is `Ok` with kind `Unresolved`.
    pub async fn resolve(&self, name: &str) -> Result<CommandDescriptor> {
        if name.is_empty() {
            return Ok(CommandDescriptor::unresolved(name));
        }

        if let Some(cmd) = InternalCommand::from_name(name) {
            debug!("resolved {} as internal", name);
            return Ok(CommandDescriptor::resolved(
                name,
                CommandKind::Internal,
                Handler::Internal(cmd),
            ));
        }

        match self.provider.try_load(name).await {
            Ok(module) => {
                debug!("resolved {} as core", name);
                return Ok(CommandDescriptor::resolved(
                    name,
                    CommandKind::Core,
                    Handler::Module(module),
                ));
            }
            Err(LoadError::Absent) => {}
            Err(LoadError::Failed(reason)) => {
                warn!("core module {} failed to load: {}", name, reason);
                return Err(ShellError::CommandLoadFailure {
                    name: name.to_string(),
                    reason,
                });
            }
        }

        if let Some(module) = self.external.find(name) {
            debug!("resolved {} as external", name);
            return Ok(CommandDescriptor::resolved(
                name,
                CommandKind::External,
                Handler::Module(module),
            ));
        }

        debug!("{} did not resolve", name);
        Ok(CommandDescriptor::unresolved(name))
    }
}

impl Default for CommandResolver {
    /// Resolver over the built-in module catalog.
    fn default() -> Self {
        Self::new(ModuleCatalog::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::module::{Echo, ModuleError};
    use crate::parser::ParsedArgs;
    use crate::terminal::LineSink;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that counts load attempts.
    #[derive(Default)]
    struct CountingProvider {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CommandProvider for CountingProvider {
        async fn try_load(&self, _name: &str) -> std::result::Result<Arc<dyn CommandModule>, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LoadError::Absent)
        }
    }

    struct Exploding;

    #[async_trait]
    impl CommandProvider for Exploding {
        async fn try_load(&self, _name: &str) -> std::result::Result<Arc<dyn CommandModule>, LoadError> {
            Err(LoadError::Failed("threw during init".into()))
        }
    }

    struct Ls;

    #[async_trait]
    impl CommandModule for Ls {
        fn description(&self) -> &str {
            "list files"
        }

        async fn run(&self, _args: &ParsedArgs, _out: &mut dyn LineSink) -> std::result::Result<(), ModuleError> {
            Ok(())
        }
    }

    struct OnlyLs;

    impl ExternalLookup for OnlyLs {
        fn find(&self, name: &str) -> Option<Arc<dyn CommandModule>> {
            (name == "ls").then(|| Arc::new(Ls) as Arc<dyn CommandModule>)
        }
    }

    #[tokio::test]
    async fn test_help_is_internal_without_loading() {
        let provider = CountingProvider::default();
        let calls = Arc::clone(&provider.calls);
        let resolver = CommandResolver::new(provider);

        let desc = resolver.resolve("help").await.unwrap();
        assert_eq!(desc.kind, CommandKind::Internal);
        assert!(matches!(desc.handler, Some(Handler::Internal(InternalCommand::Help))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_core_module() {
        let resolver = CommandResolver::default();
        let desc = resolver.resolve("echo").await.unwrap();
        assert_eq!(desc.kind, CommandKind::Core);
        assert!(desc.is_resolved());
    }

    #[tokio::test]
    async fn test_internal_shadows_core() {
        let resolver = CommandResolver::new(
            ModuleCatalog::new().with("exit", || Ok(Arc::new(Echo) as Arc<dyn CommandModule>)),
        );
        let desc = resolver.resolve("exit").await.unwrap();
        assert_eq!(desc.kind, CommandKind::Internal);
    }

    #[tokio::test]
    async fn test_unregistered_is_unresolved() {
        let provider = CountingProvider::default();
        let calls = Arc::clone(&provider.calls);
        let resolver = CommandResolver::new(provider);

        let desc = resolver.resolve("bogus").await.unwrap();
        assert_eq!(desc.kind, CommandKind::Unresolved);
        assert!(desc.handler.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_failure_is_distinct() {
        let resolver = CommandResolver::new(Exploding);
        match resolver.resolve("anything").await {
            Err(ShellError::CommandLoadFailure { name, reason }) => {
                assert_eq!(name, "anything");
                assert_eq!(reason, "threw during init");
            }
            other => panic!("expected load failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_external_tier_after_core() {
        let resolver = CommandResolver::new(ModuleCatalog::new()).with_external(OnlyLs);
        assert_eq!(
            resolver.resolve("ls").await.unwrap().kind,
            CommandKind::External
        );
        assert_eq!(
            resolver.resolve("cat").await.unwrap().kind,
            CommandKind::Unresolved
        );
    }

    #[tokio::test]
    async fn test_empty_name_skips_every_tier() {
        let provider = CountingProvider::default();
        let calls = Arc::clone(&provider.calls);
        let resolver = CommandResolver::new(provider);

        let desc = resolver.resolve("").await.unwrap();
        assert_eq!(desc.kind, CommandKind::Unresolved);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(CommandKind::Internal.to_string(), "internal");
        assert_eq!(CommandKind::Unresolved.to_string(), "not found");
    }
}
