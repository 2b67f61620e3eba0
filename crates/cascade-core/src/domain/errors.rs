//! Errors - オーケストレーションのエラー分類
//!
//! 「エラーではない」ケースはここに含めません：
//! - AlreadyHandled: Initialized 以外のノードへの dispatch（冪等 no-op）
//! - ClaimLost: 並行する別の完了が先に claim した
//!
//! これらは `Ok(None)` / `Ok(())` + debug ログで表現します。

use thiserror::Error;

use super::ids::SubjobId;
use crate::ports::{CoordinatorError, QueueError, StoreError};

/// Faults surfaced to the immediate caller of dispatch / complete / fail.
#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),

    #[error("malformed tree at {0}: {1}")]
    MalformedTree(SubjobId, &'static str),
}

impl CascadeError {
    /// Transport-level fault the caller may retry by re-dispatching.
    pub fn is_queue_unavailable(&self) -> bool {
        matches!(self, CascadeError::Queue(QueueError::Unavailable(_)))
    }
}
