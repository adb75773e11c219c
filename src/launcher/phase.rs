//! # Launch phases.
//!
//! ```text
//! Idle ──► Resolving ──► Starting ──► Running ──► Stopping ──► Terminated
//!   │          │             │
//!   └──────────┴─────────────┴──────────────────────────────► Terminated
//!   (bad args)  (unknown name)  (no healthy instances / policy)
//! ```
//!
//! Phases only move forward. `Terminated` is final for one launch; the next
//! launch resets to `Idle`.

use std::fmt;

/// Where one launch currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LaunchPhase {
    /// Nothing parsed yet.
    #[default]
    Idle,
    /// Looking the workload up in the registry.
    Resolving,
    /// Instances are being started.
    Starting,
    /// At least one instance is live; waiting for termination.
    Running,
    /// Stopping the group.
    Stopping,
    /// Done, successfully or not.
    Terminated,
}

impl LaunchPhase {
    /// Returns a short stable label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            LaunchPhase::Idle => "idle",
            LaunchPhase::Resolving => "resolving",
            LaunchPhase::Starting => "starting",
            LaunchPhase::Running => "running",
            LaunchPhase::Stopping => "stopping",
            LaunchPhase::Terminated => "terminated",
        }
    }

    /// True if `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: LaunchPhase) -> bool {
        use LaunchPhase::*;
        matches!(
            (self, next),
            (Idle, Resolving)
                | (Idle, Terminated)
                | (Resolving, Starting)
                | (Resolving, Terminated)
                | (Starting, Running)
                | (Starting, Terminated)
                | (Running, Stopping)
                | (Stopping, Terminated)
        )
    }

    /// True for the final phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LaunchPhase::Terminated)
    }
}

impl fmt::Display for LaunchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_legal() {
        let path = [
            LaunchPhase::Idle,
            LaunchPhase::Resolving,
            LaunchPhase::Starting,
            LaunchPhase::Running,
            LaunchPhase::Stopping,
            LaunchPhase::Terminated,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn no_going_back_or_skipping_the_stop() {
        assert!(!LaunchPhase::Running.can_transition_to(LaunchPhase::Starting));
        assert!(!LaunchPhase::Running.can_transition_to(LaunchPhase::Terminated));
        assert!(!LaunchPhase::Terminated.can_transition_to(LaunchPhase::Idle));
        assert!(!LaunchPhase::Idle.can_transition_to(LaunchPhase::Running));
    }

    #[test]
    fn early_exits() {
        assert!(LaunchPhase::Resolving.can_transition_to(LaunchPhase::Terminated));
        assert!(LaunchPhase::Starting.can_transition_to(LaunchPhase::Terminated));
        assert!(LaunchPhase::Terminated.is_terminal());
    }
}
