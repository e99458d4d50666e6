//! Session records and the registry that owns them.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Local};

use super::SessionId;
use crate::error::ShellError;
use crate::Result;

/// Prompt shown when none is configured.
pub const DEFAULT_PROMPT: &str = ">> ";

/// A shell session.
///
/// Sessions refer to their parent and child only by identifier; the
/// registry owns every session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique identifier.
    pub id: SessionId,
    /// Time when session was created.
    pub start_time: DateTime<Local>,
    /// Prompt shown before each line of input.
    pub prompt: String,
    /// The session that spawned this one.
    pub parent_id: Option<SessionId>,
    /// The live child session, if any.
    pub child_id: Option<SessionId>,
}

impl Session {
    /// Create a session record with the default prompt and no child.
    pub fn new(id: SessionId, start_time: DateTime<Local>, parent_id: Option<SessionId>) -> Self {
        Self {
            id,
            start_time,
            prompt: DEFAULT_PROMPT.to_string(),
            parent_id,
            child_id: None,
        }
    }

    /// Set the prompt string.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Whether this is the first session of the process.
    pub fn is_top_most(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Thread-safe table of live sessions keyed by identifier.
///
/// None of the operations fail on a poisoned lock; the guard is recovered
/// so that lookups never panic.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SessionId, Session>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, Session>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a session.
    ///
    /// Fails with `DuplicateIdentifier` if the identifier is taken; the
    /// existing session is left untouched.
    pub fn register(&self, session: Session) -> Result<()> {
        let mut sessions = self.write();
        if sessions.contains_key(&session.id) {
            return Err(ShellError::DuplicateIdentifier(session.id));
        }
        sessions.insert(session.id, session);
        Ok(())
    }

    /// Remove a session, returning it if it was registered.
    ///
    /// Removing an absent identifier is a no-op.
    pub fn deregister(&self, id: &SessionId) -> Option<Session> {
        self.write().remove(id)
    }

    /// Get a clone of the session with the given ID.
    pub fn lookup(&self, id: &SessionId) -> Option<Session> {
        self.read().get(id).cloned()
    }

    /// Check if a session exists.
    pub fn contains(&self, id: &SessionId) -> bool {
        self.read().contains_key(id)
    }

    /// Update a session using a closure.
    ///
    /// Returns `SessionNotFound` if the session doesn't exist.
    pub fn update<F, T>(&self, id: &SessionId, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> T,
    {
        let mut sessions = self.write();
        let session = sessions
            .get_mut(id)
            .ok_or(ShellError::SessionNotFound(*id))?;
        Ok(f(session))
    }

    /// Get the number of registered sessions.
    pub fn count(&self) -> usize {
        self.read().len()
    }

    /// List all session IDs in creation order.
    pub fn list_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.read().keys().copied().collect();
        ids.sort();
        ids
    }
}
