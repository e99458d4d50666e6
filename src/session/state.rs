//! REPL loop state machine.

/// Represents where a session's read-resolve-execute cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// About to show the prompt.
    #[default]
    Prompting,
    /// Blocked waiting for a line of input.
    Reading,
    /// Tokenizing the line and resolving the command name.
    Resolving,
    /// Running the resolved handler.
    Executing,
    /// The loop has finished; the session is being torn down.
    Terminating,
}

impl LoopState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Prompting -> Reading
    /// - Reading -> Resolving
    /// - Reading -> Terminating (end of input)
    /// - Resolving -> Prompting (empty line, unresolved, load failure)
    /// - Resolving -> Executing
    /// - Executing -> Prompting
    /// - Executing -> Terminating
    pub fn can_transition_to(&self, target: LoopState) -> bool {
        use LoopState::*;
        matches!(
            (*self, target),
            (Prompting, Reading)
                | (Reading, Resolving)
                | (Reading, Terminating)
                | (Resolving, Prompting)
                | (Resolving, Executing)
                | (Executing, Prompting)
                | (Executing, Terminating)
        )
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&mut self, target: LoopState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::ShellError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is the terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Terminating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let mut state = LoopState::Prompting;
        assert!(state.transition_to(LoopState::Reading).is_ok());
        assert!(state.transition_to(LoopState::Resolving).is_ok());
        assert!(state.transition_to(LoopState::Executing).is_ok());
        assert!(state.transition_to(LoopState::Prompting).is_ok());
        assert_eq!(state, LoopState::Prompting);
    }

    #[test]
    fn test_exit_path() {
        let mut state = LoopState::Executing;
        assert!(state.transition_to(LoopState::Terminating).is_ok());
        assert!(state.is_terminal());
    }

    #[test]
    fn test_end_of_input_path() {
        let mut state = LoopState::Reading;
        assert!(state.transition_to(LoopState::Terminating).is_ok());
    }

    #[test]
    fn test_invalid_skip_resolution() {
        let mut state = LoopState::Reading;
        assert!(state.transition_to(LoopState::Executing).is_err());
        assert_eq!(state, LoopState::Reading);
    }

    #[test]
    fn test_invalid_from_terminating() {
        let mut state = LoopState::Terminating;
        assert!(state.transition_to(LoopState::Prompting).is_err());
        assert!(state.transition_to(LoopState::Reading).is_err());
    }

    #[test]
    fn test_resolving_cannot_terminate() {
        assert!(!LoopState::Resolving.can_transition_to(LoopState::Terminating));
    }

    #[test]
    fn test_default() {
        assert_eq!(LoopState::default(), LoopState::Prompting);
    }
}
