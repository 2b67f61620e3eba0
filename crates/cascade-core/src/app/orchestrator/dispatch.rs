//! Dispatcher - ノードの種類に応じた投入
//!
//! `dispatch` は永続化された status が `Initialized` のときだけ動きます。
//! それ以外は処理中か完了済みなので、何もせず `Ok(None)` を返します。

use tracing::{debug, info};

use super::{BoxFuture, Orchestrator};
use crate::domain::{CascadeError, JobId, Subjob, SubjobId, SubjobKind, SubjobStatus, WorkerRef};
use crate::ports::Uniqueness;

type DispatchResult = Result<Option<JobId>, CascadeError>;

impl Orchestrator {
    /// Submit `id` according to its kind.
    ///
    /// Returns the job id pushed to the queue. Composites return a
    /// representative child's job id; nested superjobs return `None`.
    pub fn dispatch(&self, id: SubjobId) -> BoxFuture<'_, DispatchResult> {
        Box::pin(async move {
            let node = self.store.load(id).await?;
            if node.status != SubjobStatus::Initialized {
                debug!(subjob_id = %id, status = ?node.status, "already handled; skipping dispatch");
                return Ok(None);
            }
            self.dispatch_held(node, SubjobStatus::Initialized).await
        })
    }

    /// Dispatch a node whose status the caller is entitled to move from `held`.
    ///
    /// `held` is `Initialized` for a fresh dispatch and `Queued` once the
    /// completion cascade has claimed the node as a successor.
    pub(crate) fn dispatch_held(&self, node: Subjob, held: SubjobStatus) -> BoxFuture<'_, DispatchResult> {
        Box::pin(async move {
            debug!(subjob_id = %node.id, kind = node.kind.label(), "dispatching");
            match node.kind.clone() {
                SubjobKind::Leaf(worker) => self.dispatch_leaf(node, worker, held).await,
                SubjobKind::Sequential => self.dispatch_sequential(node, held).await,
                SubjobKind::Parallel => self.dispatch_parallel(node, held).await,
                SubjobKind::Batch => self.dispatch_batch(node, held).await,
                SubjobKind::BatchChild => self.dispatch_batch_child(node, held).await,
                SubjobKind::NestedSuperjob(_) => self.dispatch_nested(node, held).await,
            }
        })
    }

    async fn dispatch_leaf(&self, node: Subjob, worker: WorkerRef, held: SubjobStatus) -> DispatchResult {
        // キューが完了を返すより先に正本へ書けるよう、外部とのやり取りの前に生成する
        let job_id = self.ids.generate_job_id();

        if !self.claim_from(node.id, held, SubjobStatus::Queued).await? {
            return Ok(None);
        }
        self.store.assign_job_id(node.id, job_id).await?;

        // 実行は job_id で一意なので、unique 設定はこの push だけ止める
        self.queue
            .push(job_id, &worker, &node.args, &node.meta, Uniqueness::Suspend)
            .await?;

        info!(subjob_id = %node.id, %job_id, %worker, "leaf queued");
        Ok(Some(job_id))
    }

    async fn dispatch_sequential(&self, node: Subjob, held: SubjobStatus) -> DispatchResult {
        if !self.claim_from(node.id, held, SubjobStatus::Running).await? {
            return Ok(None);
        }
        match node.first_child() {
            Some(first) => self.dispatch(first).await,
            None => {
                self.complete(node.id).await?;
                Ok(None)
            }
        }
    }

    async fn dispatch_parallel(&self, node: Subjob, held: SubjobStatus) -> DispatchResult {
        if !self.claim_from(node.id, held, SubjobStatus::Running).await? {
            return Ok(None);
        }
        if node.children.is_empty() {
            self.complete(node.id).await?;
            return Ok(None);
        }

        let mut first_job = None;
        let mut first_error = None;
        for (position, child) in node.children.iter().enumerate() {
            match self.dispatch(*child).await {
                Ok(job_id) if position == 0 => first_job = job_id,
                Ok(_) => {}
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(first_job),
        }
    }

    async fn dispatch_batch(&self, node: Subjob, held: SubjobStatus) -> DispatchResult {
        if !self.claim_from(node.id, held, SubjobStatus::Running).await? {
            return Ok(None);
        }
        if node.children.is_empty() {
            self.complete(node.id).await?;
            return Ok(None);
        }

        let mut first_job = None;
        let mut first_error = None;
        for (position, child_id) in node.children.iter().enumerate() {
            match self.start_batch_member(*child_id).await {
                Ok(job_id) if position == 0 => first_job = job_id,
                Ok(_) => {}
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(first_job),
        }
    }

    async fn start_batch_member(&self, child_id: SubjobId) -> DispatchResult {
        let child = self.store.load(child_id).await?;
        if child.kind != SubjobKind::BatchChild {
            return Err(CascadeError::MalformedTree(
                child.id,
                "batch members must be batch children",
            ));
        }
        self.dispatch_batch_child(child, SubjobStatus::Initialized).await
    }

    async fn dispatch_batch_child(&self, node: Subjob, held: SubjobStatus) -> DispatchResult {
        let [grandchild] = node.children.as_slice() else {
            return Err(CascadeError::MalformedTree(
                node.id,
                "batch child must wrap exactly one subjob",
            ));
        };
        if !self.claim_from(node.id, held, SubjobStatus::Running).await? {
            return Ok(None);
        }
        self.dispatch(*grandchild).await
    }

    async fn dispatch_nested(&self, node: Subjob, held: SubjobStatus) -> DispatchResult {
        if !self.claim_from(node.id, held, SubjobStatus::Running).await? {
            return Ok(None);
        }
        // 自前の仕事を持たないので、その場で完了扱いにして後続へ進める
        self.complete(node.id).await?;
        Ok(None)
    }
}
