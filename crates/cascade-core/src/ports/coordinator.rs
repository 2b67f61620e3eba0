//! SuperjobCoordinator port - superjob 単位の管理
//!
//! 全体ステータスや投入者への通知はコーディネータの責務です。
//! コアは終端の結果を伝えるだけです。

use async_trait::async_trait;

use crate::domain::{Subjob, SuperjobId, WorkerRef};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    #[error("coordinator rejected the report: {0}")]
    Rejected(String),
}

/// SuperjobCoordinator は superjob の終端結果を受け取る
#[async_trait]
pub trait SuperjobCoordinator: Send + Sync {
    /// The root's subtree finished.
    async fn complete(&self, superjob_id: SuperjobId) -> Result<(), CoordinatorError>;

    /// A branch failed. May be called once per failing branch.
    async fn error(
        &self,
        superjob_id: SuperjobId,
        worker: Option<&WorkerRef>,
        item: &Subjob,
        cause: &str,
    ) -> Result<(), CoordinatorError>;
}
