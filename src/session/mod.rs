//! Session management module.
//!
//! This module provides types and utilities for managing shell sessions,
//! including session identification, the registry of live sessions, the
//! per-session loop state, and creation and teardown.

pub mod clock;
mod id;
mod manager;
mod registry;
mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use id::{IdGenerator, SessionId};
pub use manager::SessionManager;
pub use registry::{Session, SessionRegistry, DEFAULT_PROMPT};
pub use state::LoopState;
