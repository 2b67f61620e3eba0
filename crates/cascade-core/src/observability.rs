use serde::{Deserialize, Serialize};

use crate::domain::SubjobStatus;

/// Per-status node counts of one superjob tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeCounts {
    pub initialized: usize,
    pub queued: usize,
    pub running: usize,
    pub complete: usize,
    pub failed: usize,
    pub descendants_complete: usize,
}

impl TreeCounts {
    pub fn record(&mut self, status: SubjobStatus, descendants_complete: bool) {
        match status {
            SubjobStatus::Initialized => self.initialized += 1,
            SubjobStatus::Queued => self.queued += 1,
            SubjobStatus::Running => self.running += 1,
            SubjobStatus::Complete => self.complete += 1,
            SubjobStatus::Failed => self.failed += 1,
        }
        if descendants_complete {
            self.descendants_complete += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.initialized + self.queued + self.running + self.complete + self.failed
    }
}
