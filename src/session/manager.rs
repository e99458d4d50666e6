//! Session creation and teardown.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::clock::TIME_FORMAT;
use super::{Clock, IdGenerator, Session, SessionId, SessionRegistry, SystemClock, DEFAULT_PROMPT};
use crate::command::CommandResolver;
use crate::error::ShellError;
use crate::repl::Repl;
use crate::terminal::{LineSink, Terminal};
use crate::Result;

/// How many fresh identifiers to try before giving up on a creation.
const MAX_ID_ATTEMPTS: u32 = 8;

/// Creates sessions, runs their loops, and tears them down.
///
/// All sessions live in the injected [`SessionRegistry`]. A session holds
/// the terminal from creation until teardown; spawning a child lends the
/// terminal to the child and the parent resumes prompting once the child
/// has been torn down.
pub struct SessionManager {
    registry: Arc<SessionRegistry>,
    resolver: CommandResolver,
    clock: Arc<dyn Clock>,
    ids: IdGenerator,
    prompt: String,
}

impl SessionManager {
    /// Create a manager over `registry` resolving commands with `resolver`.
    pub fn new(registry: Arc<SessionRegistry>, resolver: CommandResolver) -> Self {
        Self {
            registry,
            resolver,
            clock: Arc::new(SystemClock),
            ids: IdGenerator::new(),
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    /// Use a different timestamp source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Prompt given to new sessions.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// The session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The command resolver.
    pub fn resolver(&self) -> &CommandResolver {
        &self.resolver
    }

    /// Prompt given to new sessions.
    pub fn default_prompt(&self) -> &str {
        &self.prompt
    }

    /// Create and register a session, then emit its birth notice.
    ///
    /// An identifier collision in the registry is retried with a fresh
    /// identifier; the existing session is never replaced.
    pub fn create(&self, parent: Option<SessionId>, out: &mut dyn LineSink) -> Result<Session> {
        let start_time = self.clock.now();
        let mut attempt = 1;

        let session = loop {
            let candidate = Session::new(self.ids.next(start_time), start_time, parent)
                .with_prompt(self.prompt.as_str());

            match self.registry.register(candidate.clone()) {
                Ok(()) => break candidate,
                Err(ShellError::DuplicateIdentifier(id)) if attempt < MAX_ID_ATTEMPTS => {
                    warn!("session id {} already registered, regenerating", id);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        info!("session {} created (parent: {:?})", session.id, session.parent_id);
        birth_notice(&session, out);
        Ok(session)
    }

    /// Create a child of `parent` and link it as the parent's live child.
    ///
    /// Fails with `ChildAlreadyLive` if the parent already has one.
    pub fn create_child(&self, parent: SessionId, out: &mut dyn LineSink) -> Result<Session> {
        let existing = self
            .registry
            .lookup(&parent)
            .ok_or(ShellError::SessionNotFound(parent))?;
        if let Some(child) = existing.child_id {
            return Err(ShellError::ChildAlreadyLive { parent, child });
        }

        let child = self.create(Some(parent), out)?;

        let linked = self.registry.update(&parent, |p| match p.child_id {
            Some(other) => Err(other),
            None => {
                p.child_id = Some(child.id);
                Ok(())
            }
        });

        match linked {
            Ok(Ok(())) => Ok(child),
            Ok(Err(other)) => {
                self.registry.deregister(&child.id);
                Err(ShellError::ChildAlreadyLive {
                    parent,
                    child: other,
                })
            }
            Err(e) => {
                self.registry.deregister(&child.id);
                Err(e)
            }
        }
    }

    /// Create the top-most session and run it until it exits.
    pub async fn open(&self, term: &mut Terminal) -> Result<SessionId> {
        let session = self.create(None, term.output())?;
        self.drive(session.id, term).await?;
        Ok(session.id)
    }

    /// Spawn a child of `parent` and run it in the foreground until it exits.
    pub async fn spawn_child(&self, parent: SessionId, term: &mut Terminal) -> Result<SessionId> {
        let child = self.create_child(parent, term.output())?;
        self.drive(child.id, term).await?;
        Ok(child.id)
    }

    /// Run the loop of a registered session, then tear it down.
    async fn drive(&self, id: SessionId, term: &mut Terminal) -> Result<()> {
        let mut registration = Registration::new(self, id);

        let outcome = Repl::new(self, id).run(term).await;
        if let Err(e) = &outcome {
            error!("session {} loop failed: {}", id, e);
        }

        self.teardown(id, term.output());
        registration.disarm();
        outcome
    }

    /// Tear down a session: its live child first, then unlink it from its
    /// parent, deregister it and emit its death notice.
    ///
    /// Returns `false` if the session was not registered, which makes
    /// repeated calls harmless.
    pub fn teardown(&self, id: SessionId, out: &mut dyn LineSink) -> bool {
        let Some(session) = self.registry.lookup(&id) else {
            return false;
        };

        if let Some(child) = session.child_id {
            self.teardown(child, out);
        }

        if self.retire(id).is_none() {
            return false;
        }

        death_notice(&session, out);
        info!("session {} torn down", id);
        true
    }

    /// Deregister `id` and clear its parent's child link.
    fn retire(&self, id: SessionId) -> Option<Session> {
        let removed = self.registry.deregister(&id)?;
        if let Some(parent) = removed.parent_id {
            // The parent may already be gone
            let _ = self.registry.update(&parent, |p| {
                if p.child_id == Some(id) {
                    p.child_id = None;
                }
            });
        }
        Some(removed)
    }
}

/// Deregisters a session on drop unless teardown already ran.
struct Registration<'a> {
    manager: &'a SessionManager,
    id: SessionId,
    armed: bool,
}

impl<'a> Registration<'a> {
    fn new(manager: &'a SessionManager, id: SessionId) -> Self {
        Self {
            manager,
            id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if self.armed && self.manager.retire(self.id).is_some() {
            warn!("session {} deregistered without teardown", self.id);
        }
    }
}

fn birth_notice(session: &Session, out: &mut dyn LineSink) {
    out.write_line("*****");
    out.write_line(&format!(
        "Shell ({}) started on {}",
        session.id,
        session.start_time.format(TIME_FORMAT)
    ));
    if session.is_top_most() {
        out.write_line("This is the top-most shell");
    }
    out.write_line("*****");
}

fn death_notice(session: &Session, out: &mut dyn LineSink) {
    out.write_line("*****");
    out.write_line(&format!("Shell ({}) exiting...", session.id));
    match session.parent_id {
        Some(parent) => out.write_line(&format!("Returning to parent shell ({})", parent)),
        None => out.write_line("This was the top-most shell"),
    }
    out.write_line("*****");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ManualClock;
    use crate::terminal::CapturedOutput;
    use chrono::{Local, TimeZone};

    fn frozen_clock() -> Arc<dyn Clock> {
        Arc::new(ManualClock::new(
            Local.timestamp_millis_opt(1_700_000_000_000).unwrap(),
        ))
    }

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(SessionRegistry::new()), CommandResolver::default())
            .with_clock(frozen_clock())
    }

    #[test]
    fn test_create_registers_and_announces() {
        let manager = manager();
        let mut out = CapturedOutput::new();

        let session = manager.create(None, &mut out).unwrap();
        assert!(manager.registry().contains(&session.id));
        assert!(session.is_top_most());

        let lines = out.lines();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "*****");
        assert!(lines[1].starts_with(&format!("Shell ({}) started on ", session.id)));
        assert_eq!(lines[2], "This is the top-most shell");
        assert_eq!(lines[3], "*****");
    }

    #[test]
    fn test_same_tick_creations_get_distinct_ids() {
        let manager = manager();
        let mut out = CapturedOutput::new();

        let a = manager.create(None, &mut out).unwrap();
        let b = manager.create(None, &mut out).unwrap();
        assert_eq!(a.id.stamp(), b.id.stamp());
        assert_ne!(a.id, b.id);
        assert_eq!(manager.registry().count(), 2);
    }

    #[test]
    fn test_collision_in_shared_registry_regenerates() {
        let registry = Arc::new(SessionRegistry::new());
        let clock = frozen_clock();
        let first = SessionManager::new(Arc::clone(&registry), CommandResolver::default())
            .with_clock(Arc::clone(&clock));
        let second = SessionManager::new(Arc::clone(&registry), CommandResolver::default())
            .with_clock(clock);
        let mut out = CapturedOutput::new();

        // Both generators start at the same sequence number
        let a = first.create(None, &mut out).unwrap();
        let b = second.create(None, &mut out).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_child_links_and_unlinks() {
        let manager = manager();
        let mut out = CapturedOutput::new();

        let parent = manager.create(None, &mut out).unwrap();
        let child = manager.create_child(parent.id, &mut out).unwrap();

        assert_eq!(child.parent_id, Some(parent.id));
        assert!(!child.is_top_most());
        assert_eq!(
            manager.registry().lookup(&parent.id).unwrap().child_id,
            Some(child.id)
        );

        assert!(manager.teardown(child.id, &mut out));
        assert_eq!(manager.registry().lookup(&parent.id).unwrap().child_id, None);
        assert!(manager.registry().lookup(&child.id).is_none());
    }

    #[test]
    fn test_second_live_child_rejected() {
        let manager = manager();
        let mut out = CapturedOutput::new();

        let parent = manager.create(None, &mut out).unwrap();
        let child = manager.create_child(parent.id, &mut out).unwrap();

        match manager.create_child(parent.id, &mut out) {
            Err(ShellError::ChildAlreadyLive { parent: p, child: c }) => {
                assert_eq!(p, parent.id);
                assert_eq!(c, child.id);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(manager.registry().count(), 2);
    }

    #[test]
    fn test_child_of_missing_parent() {
        let manager = manager();
        let mut out = CapturedOutput::new();
        let result = manager.create_child(SessionId::from_parts(1, 1), &mut out);
        assert!(matches!(result, Err(ShellError::SessionNotFound(_))));
        assert_eq!(manager.registry().count(), 0);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let manager = manager();
        let mut out = CapturedOutput::new();
        let session = manager.create(None, &mut out).unwrap();

        assert!(manager.teardown(session.id, &mut out));
        let after_first = out.lines().len();

        assert!(!manager.teardown(session.id, &mut out));
        assert_eq!(out.lines().len(), after_first);
        assert_eq!(manager.registry().count(), 0);
    }

    #[test]
    fn test_teardown_notices() {
        let manager = manager();
        let mut out = CapturedOutput::new();
        let parent = manager.create(None, &mut out).unwrap();
        let child = manager.create_child(parent.id, &mut out).unwrap();

        let mut notices = CapturedOutput::new();
        manager.teardown(parent.id, &mut notices);

        // Child goes first, pointing back at its parent
        assert_eq!(
            notices.lines(),
            vec![
                "*****".to_string(),
                format!("Shell ({}) exiting...", child.id),
                format!("Returning to parent shell ({})", parent.id),
                "*****".to_string(),
                "*****".to_string(),
                format!("Shell ({}) exiting...", parent.id),
                "This was the top-most shell".to_string(),
                "*****".to_string(),
            ]
        );
        assert_eq!(manager.registry().count(), 0);
    }

    #[test]
    fn test_registration_guard_deregisters_on_drop() {
        let manager = manager();
        let mut out = CapturedOutput::new();
        let session = manager.create(None, &mut out).unwrap();

        {
            let _registration = Registration::new(&manager, session.id);
        }
        assert!(!manager.registry().contains(&session.id));
    }

    #[test]
    fn test_disarmed_guard_leaves_session() {
        let manager = manager();
        let mut out = CapturedOutput::new();
        let session = manager.create(None, &mut out).unwrap();

        {
            let mut registration = Registration::new(&manager, session.id);
            registration.disarm();
        }
        assert!(manager.registry().contains(&session.id));
    }
}
