//! Error types for nested-shell.

use thiserror::Error;

use crate::session::{LoopState, SessionId};

/// Main error type for nested-shell operations.
#[derive(Error, Debug)]
pub enum ShellError {
    /// The command name matched no resolution tier.
    #[error("invalid command `{0}`")]
    CommandNotFound(String),

    /// A core module exists but failed while loading or initializing.
    #[error("unhandled error while loading `{name}`: {reason}")]
    CommandLoadFailure { name: String, reason: String },

    /// A resolved command failed while running.
    #[error("command `{name}` failed: {reason}")]
    CommandFailed { name: String, reason: String },

    /// The registry already holds a session with this identifier.
    #[error("duplicate session identifier: {0}")]
    DuplicateIdentifier(SessionId),

    /// Session with the given ID was not found.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// The parent already has a live child session.
    #[error("session {parent} already has a live child {child}")]
    ChildAlreadyLive { parent: SessionId, child: SessionId },

    /// Text that does not parse as a session identifier.
    #[error("invalid session identifier: {0}")]
    InvalidSessionId(String),

    /// Invalid REPL state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition { from: LoopState, to: LoopState },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for nested-shell operations.
pub type Result<T> = std::result::Result<T, ShellError>;
