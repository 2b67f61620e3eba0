//! Completion cascade - 完了の伝播
//!
//! # フロー
//! 1. `complete`: status を Complete にし、子があれば最初の子を dispatch
//! 2. 子がなければ `mark_descendants_complete` でサブツリー完了を記録
//! 3. 兄弟が全員完了していれば親へ再帰
//! 4. 並列の子は後続を持たない。それ以外は `next` を claim して dispatch
//! 5. 後続も親もなければ superjob 完了をコーディネータへ通知

use tracing::{debug, info};

use super::{BoxFuture, Orchestrator};
use crate::domain::{CascadeError, JobId, Subjob, SubjobId, SubjobKind, SubjobStatus};

impl Orchestrator {
    /// Record that `id` finished and advance whatever follows it.
    ///
    /// A repeated completion of a terminal node is ignored, since the queue
    /// may deliver the worker callback more than once.
    pub fn complete(&self, id: SubjobId) -> BoxFuture<'_, Result<(), CascadeError>> {
        Box::pin(async move {
            let Some(previous) = self.store.advance(id, SubjobStatus::Complete).await? else {
                debug!(subjob_id = %id, "already terminal; ignoring completion");
                return Ok(());
            };
            let node = self.store.load(id).await?;
            debug!(subjob_id = %id, kind = node.kind.label(), ?previous, "complete");

            match node.first_child() {
                Some(first) => {
                    self.dispatch(first).await?;
                }
                None => self.mark_descendants_complete(id).await?,
            }
            Ok(())
        })
    }

    /// Record that the whole subtree under `id` has finished.
    pub fn mark_descendants_complete(&self, id: SubjobId) -> BoxFuture<'_, Result<(), CascadeError>> {
        Box::pin(async move {
            if !self.store.mark_descendants_complete(id).await? {
                debug!(subjob_id = %id, "descendants already complete");
                return Ok(());
            }
            let node = self.store.load(id).await?;

            match node.kind {
                SubjobKind::Batch | SubjobKind::BatchChild => self.complete(id).await?,
                SubjobKind::Sequential | SubjobKind::Parallel => {
                    self.store.advance(id, SubjobStatus::Complete).await?;
                }
                SubjobKind::Leaf(_) | SubjobKind::NestedSuperjob(_) => {}
            }

            let parent = match node.parent() {
                Some(parent_id) => Some(self.store.load(parent_id).await?),
                None => None,
            };

            if let Some(parent) = &parent {
                if self.children_done(parent).await? {
                    if self.is_parallel_member(parent).await? {
                        self.store.advance(parent.id, SubjobStatus::Complete).await?;
                    }
                    self.mark_descendants_complete(parent.id).await?;
                }
                if parent.kind == SubjobKind::Parallel {
                    return Ok(());
                }
            }

            match (node.next(), &parent) {
                (Some(successor), _) => self.claim_successor(successor).await?,
                (None, None) => {
                    info!(superjob_id = %node.superjob_id, "superjob tree finished");
                    self.coordinator.complete(node.superjob_id).await?;
                }
                (None, Some(_)) => {}
            }
            Ok(())
        })
    }

    /// Claim `successor` for dispatch; only one concurrent caller proceeds.
    pub(crate) async fn claim_successor(&self, successor: SubjobId) -> Result<(), CascadeError> {
        if !self
            .try_claim(successor, SubjobStatus::Initialized, SubjobStatus::Queued)
            .await?
        {
            debug!(subjob_id = %successor, "successor claimed by a concurrent completion");
            return Ok(());
        }
        let node = self.store.load(successor).await?;
        self.dispatch_held(node, SubjobStatus::Queued).await?;
        Ok(())
    }

    /// Worker reported that it picked up `job_id`.
    pub async fn mark_started(&self, job_id: JobId) -> Result<bool, CascadeError> {
        let node = self.store.find_by_job_id(job_id).await?;
        let started = self
            .try_claim(node.id, SubjobStatus::Queued, SubjobStatus::Running)
            .await?;
        Ok(started)
    }

    /// Worker success callback, keyed by the job id assigned at dispatch.
    pub async fn complete_job(&self, job_id: JobId) -> Result<(), CascadeError> {
        let node = self.store.find_by_job_id(job_id).await?;
        self.complete(node.id).await
    }

    async fn children_done(&self, parent: &Subjob) -> Result<bool, CascadeError> {
        for child in parent.children() {
            if !self.store.load(*child).await?.descendants_complete {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn is_parallel_member(&self, node: &Subjob) -> Result<bool, CascadeError> {
        match node.parent() {
            Some(parent_id) => Ok(self.store.load(parent_id).await?.kind == SubjobKind::Parallel),
            None => Ok(false),
        }
    }
}
