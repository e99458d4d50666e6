//! The per-session read-resolve-execute loop.

use tracing::{debug, warn};

use crate::command::{CommandDescriptor, Handler, InternalCommand};
use crate::error::ShellError;
use crate::parser::{parse_line, ParsedArgs};
use crate::session::clock::TIME_FORMAT;
use crate::session::{LoopState, Session, SessionId, SessionManager};
use crate::terminal::Terminal;
use crate::Result;

/// What the loop does after a command ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// The loop of one session.
///
/// Iterations are strictly sequential: a line is read only after the
/// previous command has finished, including any child shell it started.
pub struct Repl<'a> {
    manager: &'a SessionManager,
    session: SessionId,
}

impl<'a> Repl<'a> {
    /// Create the loop for a registered session.
    pub fn new(manager: &'a SessionManager, session: SessionId) -> Self {
        Self { manager, session }
    }

    /// Run until `exit` or end of input.
    ///
    /// Command failures are reported on the terminal and never end the
    /// loop. Only an input error does.
    pub async fn run(&self, term: &mut Terminal) -> Result<()> {
        let mut state = LoopState::Prompting;
        let mut prompt = String::new();
        let mut line = String::new();
        let mut pending: Option<(CommandDescriptor, ParsedArgs)> = None;

        loop {
            let next = match state {
                LoopState::Prompting => {
                    prompt = self.prompt();
                    LoopState::Reading
                }
                LoopState::Reading => match term.read_line(&prompt).await? {
                    Some(text) => {
                        line = text;
                        LoopState::Resolving
                    }
                    None => {
                        debug!("session {} reached end of input", self.session);
                        LoopState::Terminating
                    }
                },
                LoopState::Resolving => {
                    let parsed = parse_line(&line);
                    if parsed.is_empty() {
                        LoopState::Prompting
                    } else {
                        match self.manager.resolver().resolve(&parsed.command).await {
                            Ok(desc) if desc.is_resolved() => {
                                pending = Some((desc, parsed.args));
                                LoopState::Executing
                            }
                            Ok(desc) => {
                                term.write_line(&ShellError::CommandNotFound(desc.name).to_string());
                                LoopState::Prompting
                            }
                            Err(e) => {
                                term.write_line(&e.to_string());
                                LoopState::Prompting
                            }
                        }
                    }
                }
                LoopState::Executing => {
                    let flow = match pending.take() {
                        Some((desc, args)) => self.execute(desc, &args, term).await,
                        None => Flow::Continue,
                    };
                    match flow {
                        Flow::Exit => LoopState::Terminating,
                        Flow::Continue => LoopState::Prompting,
                    }
                }
                LoopState::Terminating => break,
            };

            debug!("session {}: {:?} -> {:?}", self.session, state, next);
            state.transition_to(next)?;
        }

        Ok(())
    }

    fn prompt(&self) -> String {
        self.manager
            .registry()
            .lookup(&self.session)
            .map(|s| s.prompt)
            .unwrap_or_else(|| self.manager.default_prompt().to_string())
    }

    async fn execute(&self, desc: CommandDescriptor, args: &ParsedArgs, term: &mut Terminal) -> Flow {
        let result = match desc.handler {
            Some(Handler::Internal(cmd)) => self.run_internal(cmd, args, term).await,
            Some(Handler::Module(module)) => module
                .run(args, term.output())
                .await
                .map(|()| Flow::Continue)
                .map_err(|e| ShellError::CommandFailed {
                    name: desc.name.clone(),
                    reason: e.to_string(),
                }),
            None => Err(ShellError::CommandNotFound(desc.name.clone())),
        };

        result.unwrap_or_else(|e| {
            warn!("session {}: {}", self.session, e);
            term.write_line(&e.to_string());
            Flow::Continue
        })
    }

    async fn run_internal(
        &self,
        cmd: InternalCommand,
        args: &ParsedArgs,
        term: &mut Terminal,
    ) -> Result<Flow> {
        match cmd {
            InternalCommand::Help => {
                for (i, cmd) in InternalCommand::ALL.iter().enumerate() {
                    term.write_line(&format!("{}. {:<12} {}", i + 1, cmd.name(), cmd.description()));
                }
            }
            InternalCommand::Exit => return Ok(Flow::Exit),
            InternalCommand::GetCommand => self.get_command(args, term).await,
            InternalCommand::Hi => term.write_line("hi"),
            InternalCommand::Shell => {
                Box::pin(self.manager.spawn_child(self.session, term)).await?;
            }
            InternalCommand::Info => self.info(args, term),
            InternalCommand::Prompt => self.set_prompt(args)?,
        }
        Ok(Flow::Continue)
    }

    async fn get_command(&self, args: &ParsedArgs, term: &mut Terminal) {
        if args.positional.is_empty() {
            term.write_line("get-command: expected at least one command name");
            return;
        }

        for name in &args.positional {
            let report = match self.manager.resolver().resolve(name).await {
                Ok(desc) => format!("{}: {}", name, desc.kind),
                Err(ShellError::CommandLoadFailure { reason, .. }) => {
                    format!("{}: load error ({})", name, reason)
                }
                Err(e) => format!("{}: {}", name, e),
            };
            term.write_line(&report);
        }
    }

    fn info(&self, args: &ParsedArgs, term: &mut Terminal) {
        let id = match args.positional.first().map(|raw| raw.parse::<SessionId>()) {
            Some(Ok(id)) => id,
            Some(Err(e)) => {
                term.write_line(&format!("{}: {}", InternalCommand::Info.name(), e));
                return;
            }
            None => self.session,
        };

        // A session can vanish between typing its id and the lookup
        match self.manager.registry().lookup(&id) {
            Some(session) => {
                for line in describe(&session) {
                    term.write_line(&line);
                }
            }
            None => term.write_line(&format!("session {} not found", id)),
        }
    }

    fn set_prompt(&self, args: &ParsedArgs) -> Result<()> {
        let mut prompt = args.positional.join(" ");
        if prompt.is_empty() {
            prompt = self.manager.default_prompt().to_string();
        } else if !prompt.ends_with(char::is_whitespace) {
            prompt.push(' ');
        }
        self.manager
            .registry()
            .update(&self.session, |s| s.prompt = prompt)
    }
}

fn describe(session: &Session) -> Vec<String> {
    let link = |id: Option<SessionId>| id.map_or_else(|| "none".to_string(), |id| id.to_string());
    vec![
        format!("id:      {}", session.id),
        format!("started: {}", session.start_time.format(TIME_FORMAT)),
        format!("parent:  {}", link(session.parent_id)),
        format!("child:   {}", link(session.child_id)),
    ]
}
