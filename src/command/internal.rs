//! The closed set of built-in commands.

/// A built-in command, recognized by exact name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternalCommand {
    Help,
    Exit,
    GetCommand,
    Hi,
    Shell,
    Info,
    Prompt,
}

impl InternalCommand {
    /// Every internal command, in declaration order.
    pub const ALL: [InternalCommand; 7] = [
        InternalCommand::Help,
        InternalCommand::Exit,
        InternalCommand::GetCommand,
        InternalCommand::Hi,
        InternalCommand::Shell,
        InternalCommand::Info,
        InternalCommand::Prompt,
    ];

    /// The name typed to invoke the command.
    pub fn name(&self) -> &'static str {
        match self {
            InternalCommand::Help => "help",
            InternalCommand::Exit => "exit",
            InternalCommand::GetCommand => "get-command",
            InternalCommand::Hi => "hi",
            InternalCommand::Shell => "shell",
            InternalCommand::Info => "info",
            InternalCommand::Prompt => "prompt",
        }
    }

    /// One-line description shown by `help`.
    pub fn description(&self) -> &'static str {
        match self {
            InternalCommand::Help => "list the built-in commands",
            InternalCommand::Exit => "leave this shell",
            InternalCommand::GetCommand => "show how each given name resolves",
            InternalCommand::Hi => "say hi",
            InternalCommand::Shell => "start a child shell",
            InternalCommand::Info => "show this shell's attributes, or another's by id",
            InternalCommand::Prompt => "set the prompt; no argument restores the default",
        }
    }

    /// Exact-match lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.name() == name)
    }
}
