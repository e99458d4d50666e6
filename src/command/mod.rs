//! Commands and how names resolve to them.
//!
//! - [`internal`]: the closed set of built-ins
//! - [`module`]: the entry point loadable commands implement
//! - [`provider`]: where core modules are loaded from
//! - [`resolver`]: the fixed-order lookup across all tiers

pub mod internal;
pub mod module;
pub mod provider;
pub mod resolver;

pub use internal::InternalCommand;
pub use module::{CommandModule, ModuleError};
pub use provider::{CommandProvider, DirectoryProvider, LoadError, ModuleCatalog, ProviderChain};
pub use resolver::{
    CommandDescriptor, CommandKind, CommandResolver, ExternalLookup, Handler, NoExternal,
};
