//! Claim protocol.
//!
//! A claim is a status transition that succeeds for exactly one caller,
//! decided against the persisted record rather than any in-memory copy.

use tracing::debug;

use super::Orchestrator;
use crate::domain::{CascadeError, SubjobId, SubjobStatus};

impl Orchestrator {
    /// Atomically move `id` from `from` to `to`.
    ///
    /// Returns `false` (claim lost) when the persisted status is not `from`.
    pub async fn try_claim(
        &self,
        id: SubjobId,
        from: SubjobStatus,
        to: SubjobStatus,
    ) -> Result<bool, CascadeError> {
        let claimed = self.store.compare_and_set(id, from, to).await?;
        if !claimed {
            debug!(subjob_id = %id, ?from, ?to, "claim lost");
        }
        Ok(claimed)
    }

    /// Claim starting from a status the caller already holds.
    ///
    /// A caller that already holds `to` (the successor claim put a leaf in
    /// `Queued`) owns the node and needs no further transition.
    pub(crate) async fn claim_from(
        &self,
        id: SubjobId,
        held: SubjobStatus,
        to: SubjobStatus,
    ) -> Result<bool, CascadeError> {
        if held == to {
            return Ok(true);
        }
        self.try_claim(id, held, to).await
    }
}
