//! Error propagation.

use tracing::{debug, warn};

use super::Orchestrator;
use crate::domain::{CascadeError, JobId, SubjobId, SubjobStatus};

impl Orchestrator {
    /// Terminate the branch at `id` and report the failure upward.
    ///
    /// Nothing is cascaded: siblings keep running and no successor is
    /// dispatched. Cross-branch cancellation is the coordinator's call.
    pub async fn fail(&self, id: SubjobId, cause: &str) -> Result<(), CascadeError> {
        if self.store.advance(id, SubjobStatus::Failed).await?.is_none() {
            debug!(subjob_id = %id, "already terminal; ignoring failure");
            return Ok(());
        }
        let node = self.store.load(id).await?;
        warn!(subjob_id = %id, superjob_id = %node.superjob_id, cause, "subjob failed");
        self.coordinator
            .error(node.superjob_id, node.worker(), &node, cause)
            .await?;
        Ok(())
    }

    /// Worker failure callback, keyed by the job id assigned at dispatch.
    pub async fn fail_job(&self, job_id: JobId, cause: &str) -> Result<(), CascadeError> {
        let node = self.store.find_by_job_id(job_id).await?;
        self.fail(node.id, cause).await
    }
}
