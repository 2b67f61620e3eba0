//! SubjobStore port - サブジョブの正本（source of truth）
//!
//! オーケストレータはこの狭い契約だけを使って状態を進めます。
//! 親や兄弟をまとめて書き換えるような暗黙の更新はありません。
//! 1 回の呼び出しで変更されるのは、名前を指定した 1 ノードだけです。

use async_trait::async_trait;

use crate::domain::{JobId, Subjob, SubjobId, SubjobStatus};

/// StoreError はストレージの障害
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("subjob not found: {0}")]
    NotFound(SubjobId),

    #[error("no subjob is assigned job id {0}")]
    UnknownJob(JobId),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// SubjobStore は subjob の状態の正本
///
/// # 設計原則
/// - 判断に使う値は毎回ここから読み直す（手元のコピーは古いかもしれない）
/// - `compare_and_set` / `mark_descendants_complete` はプロセスをまたいで原子的
///   （行ロックまたは CAS）
/// - ロックを保持したまま外部 I/O を待たない
#[async_trait]
pub trait SubjobStore: Send + Sync {
    /// Read the persisted node.
    async fn load(&self, id: SubjobId) -> Result<Subjob, StoreError>;

    /// Set `status = new` only if the persisted status equals `expected`.
    ///
    /// Returns `false` and leaves the record untouched otherwise.
    async fn compare_and_set(
        &self,
        id: SubjobId,
        expected: SubjobStatus,
        new: SubjobStatus,
    ) -> Result<bool, StoreError>;

    /// Move the status forward to `to`.
    ///
    /// Returns the previous status when the move happened, `None` when it
    /// would not be monotonic (already at or past `to`, or terminal).
    async fn advance(
        &self,
        id: SubjobId,
        to: SubjobStatus,
    ) -> Result<Option<SubjobStatus>, StoreError>;

    /// Flip `descendants_complete` from false to true.
    ///
    /// Returns `true` only for the caller that performed the flip.
    async fn mark_descendants_complete(&self, id: SubjobId) -> Result<bool, StoreError>;

    /// Persist the job id assigned at dispatch time.
    async fn assign_job_id(&self, id: SubjobId, job_id: JobId) -> Result<(), StoreError>;

    /// Resolve the node a queue job belongs to.
    async fn find_by_job_id(&self, job_id: JobId) -> Result<Subjob, StoreError>;
}
