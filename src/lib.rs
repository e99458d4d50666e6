//! # nested-shell
//!
//! Interactive command interpreter with nested sessions.
//!
//! Every session is a small read-resolve-execute loop with its own prompt
//! and identity. A session can start a child session, which takes over the
//! terminal until it exits and control returns to the parent.
//!
//! ## Features
//!
//! - **Session registry**: live sessions indexed by collision-free ids, with
//!   parent/child links held by id
//! - **Tiered resolution**: built-in commands, then loadable core modules,
//!   then an external tier, in a fixed order
//! - **Pluggable I/O**: sessions run against any line source and sink
//!
//! ## Quick Start
//!
//! ```no_run
//! use nested_shell::{Config, Terminal};
//!
//! #[tokio::main]
//! async fn main() -> nested_shell::Result<()> {
//!     nested_shell::logging::try_init(nested_shell::logging::DEFAULT_FILTER).ok();
//!
//!     let manager = Config::default().session_manager();
//!     let mut term = Terminal::stdio();
//!     manager.open(&mut term).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod parser;
pub mod repl;
pub mod session;
pub mod terminal;

// Re-export commonly used types
pub use command::{CommandDescriptor, CommandKind, CommandResolver, InternalCommand};
pub use config::Config;
pub use error::{Result, ShellError};
pub use parser::{parse_line, FlagValue, ParsedArgs, ParsedLine};
pub use session::{Session, SessionId, SessionManager, SessionRegistry};
pub use terminal::{CapturedOutput, LineReader, LineSink, LineSource, ScriptedInput, Terminal};
