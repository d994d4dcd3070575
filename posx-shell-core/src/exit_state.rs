/// Tracks shutdown so backend cleanup runs once no matter how many exit
/// signals arrive (window closed, quit menu, run-loop exit).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExitStateMachine {
    #[default]
    Running,
    Quitting,
    CleanupDone,
}

impl ExitStateMachine {
    pub fn is_quitting(&self) -> bool {
        !matches!(self, Self::Running)
    }

    pub fn mark_quitting(&mut self) {
        if *self == Self::Running {
            *self = Self::Quitting;
        }
    }

    /// Returns `true` exactly once: for the caller that must run cleanup.
    pub fn try_begin_cleanup(&mut self) -> bool {
        if *self == Self::CleanupDone {
            return false;
        }
        *self = Self::CleanupDone;
        true
    }
}
