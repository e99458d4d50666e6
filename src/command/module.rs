//! Loadable command modules.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::parser::ParsedArgs;
use crate::session::clock::{Clock, SystemClock, TIME_FORMAT};
use crate::terminal::LineSink;

/// Failure reported by a running module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    /// Arguments the module cannot work with.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Any other failure.
    #[error("{0}")]
    Failed(String),
}

/// Entry point of a core command.
#[async_trait]
pub trait CommandModule: Send + Sync {
    /// One-line description of what the command does.
    fn description(&self) -> &str;

    /// Run the command with its arguments, writing output to `out`.
    async fn run(&self, args: &ParsedArgs, out: &mut dyn LineSink) -> Result<(), ModuleError>;
}

/// Prints its positional arguments separated by spaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

#[async_trait]
impl CommandModule for Echo {
    fn description(&self) -> &str {
        "print the arguments"
    }

    async fn run(&self, args: &ParsedArgs, out: &mut dyn LineSink) -> Result<(), ModuleError> {
        out.write_line(&args.positional.join(" "));
        Ok(())
    }
}

/// Prints the current local date and time.
#[derive(Clone)]
pub struct Date {
    clock: Arc<dyn Clock>,
}

impl Date {
    /// Read the time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Default for Date {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl CommandModule for Date {
    fn description(&self) -> &str {
        "print the current date and time"
    }

    async fn run(&self, args: &ParsedArgs, out: &mut dyn LineSink) -> Result<(), ModuleError> {
        if let Some(extra) = args.positional.first() {
            return Err(ModuleError::InvalidArguments(format!(
                "unexpected argument '{}'",
                extra
            )));
        }
        out.write_line(&self.clock.now().format(TIME_FORMAT).to_string());
        Ok(())
    }
}
