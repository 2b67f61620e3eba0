//! InMemorySubjobStore - 開発・テスト用の正本
//!
//! 1 つの Mutex で全ノードを守るので、`compare_and_set` などの
//! 条件付き更新はプロセス内で線形化可能です。
//! 本番では行ロックまたは CAS を持つストレージで置き換えます。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{JobId, Subjob, SubjobId, SubjobStatus, SuperjobId};
use crate::observability::TreeCounts;
use crate::ports::{StoreError, SubjobStore};

#[derive(Default)]
struct StoreState {
    /// All nodes (single source of truth).
    nodes: HashMap<SubjobId, Subjob>,

    /// assigned_job_id -> node
    by_job: HashMap<JobId, SubjobId>,
}

impl StoreState {
    fn node_mut(&mut self, id: SubjobId) -> Result<&mut Subjob, StoreError> {
        self.nodes.get_mut(&id).ok_or(StoreError::NotFound(id))
    }
}

/// In-memory `SubjobStore`.
#[derive(Clone, Default)]
pub struct InMemorySubjobStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemorySubjobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist the nodes of an authored tree.
    pub async fn insert_tree(&self, nodes: impl IntoIterator<Item = Subjob>) {
        let mut state = self.state.lock().await;
        for node in nodes {
            if let Some(job_id) = node.assigned_job_id {
                state.by_job.insert(job_id, node.id);
            }
            state.nodes.insert(node.id, node);
        }
    }

    /// Status counts for one superjob.
    pub async fn counts(&self, superjob_id: SuperjobId) -> TreeCounts {
        let state = self.state.lock().await;
        let mut counts = TreeCounts::default();
        for node in state.nodes.values().filter(|n| n.superjob_id == superjob_id) {
            counts.record(node.status, node.descendants_complete);
        }
        counts
    }
}

#[async_trait]
impl SubjobStore for InMemorySubjobStore {
    async fn load(&self, id: SubjobId) -> Result<Subjob, StoreError> {
        let state = self.state.lock().await;
        state.nodes.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn compare_and_set(
        &self,
        id: SubjobId,
        expected: SubjobStatus,
        new: SubjobStatus,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let node = state.node_mut(id)?;
        if node.status != expected {
            return Ok(false);
        }
        node.status = new;
        Ok(true)
    }

    async fn advance(
        &self,
        id: SubjobId,
        to: SubjobStatus,
    ) -> Result<Option<SubjobStatus>, StoreError> {
        let mut state = self.state.lock().await;
        let node = state.node_mut(id)?;
        if !node.status.can_advance_to(to) {
            return Ok(None);
        }
        let previous = node.status;
        node.status = to;
        Ok(Some(previous))
    }

    async fn mark_descendants_complete(&self, id: SubjobId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let node = state.node_mut(id)?;
        if node.descendants_complete {
            return Ok(false);
        }
        node.descendants_complete = true;
        Ok(true)
    }

    async fn assign_job_id(&self, id: SubjobId, job_id: JobId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let node = state.node_mut(id)?;
        node.assigned_job_id = Some(job_id);
        state.by_job.insert(job_id, id);
        Ok(())
    }

    async fn find_by_job_id(&self, job_id: JobId) -> Result<Subjob, StoreError> {
        let state = self.state.lock().await;
        state
            .by_job
            .get(&job_id)
            .and_then(|id| state.nodes.get(id))
            .cloned()
            .ok_or(StoreError::UnknownJob(job_id))
    }
}
