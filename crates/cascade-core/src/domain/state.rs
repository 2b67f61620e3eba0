//! Subjob status state machine.

use serde::{Deserialize, Serialize};

/// Status of one subjob.
///
/// State transitions:
/// - Initialized -> Queued -> Running -> Complete
/// - Initialized -> Running (composites claimed by the dispatcher)
/// - any non-terminal -> Failed
///
/// Transitions are forward-only; `Complete` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjobStatus {
    /// Authored, not yet handled by the dispatcher.
    Initialized,

    /// Claimed for dispatch; a leaf in this state has been (or is being) pushed.
    Queued,

    /// A worker started it, or a composite whose body is in flight.
    Running,

    /// Finished successfully.
    Complete,

    /// Finished with a worker failure.
    Failed,
}

impl SubjobStatus {
    /// Position in the lifecycle. Terminal states share the last rank.
    pub fn rank(self) -> u8 {
        match self {
            SubjobStatus::Initialized => 0,
            SubjobStatus::Queued => 1,
            SubjobStatus::Running => 2,
            SubjobStatus::Complete | SubjobStatus::Failed => 3,
        }
    }

    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, SubjobStatus::Complete | SubjobStatus::Failed)
    }

    /// Whether moving from `self` to `to` keeps the status monotonic.
    pub fn can_advance_to(self, to: SubjobStatus) -> bool {
        !self.is_terminal() && to.rank() > self.rank()
    }
}
