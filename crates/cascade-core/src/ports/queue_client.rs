//! QueueClient port - 外部の at-least-once ジョブキュー
//!
//! コアが必要とするのは「明示的な ID を付けて push する」ことだけです。
//! リトライやバックオフはキュー側の責務です。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{JobId, WorkerRef};

/// QueueError はキューへの投入失敗
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("queue unavailable: {0}")]
    Unavailable(String),
}

/// Uniqueness / dedup options configured on a work type.
///
/// When active, the queue silently drops a push whose args match a job of
/// the same work type that is still pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueOptions {
    /// Compare args when deciding whether a push is a duplicate.
    pub by_args: bool,
}

/// How one push treats the unique options of its work type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Uniqueness {
    /// Apply the configured options.
    #[default]
    Enforce,

    /// Ignore them for this push only. Other pushes keep enforcing them.
    Suspend,
}

/// QueueClient は subjob の実行単位をキューへ渡す
///
/// # 設計原則
/// - job_id は呼び出し側が事前に生成して渡す
/// - unique 設定の一時停止は push 単位（共有設定は書き換えない）
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Enqueue one job under an explicit id.
    async fn push(
        &self,
        job_id: JobId,
        worker: &WorkerRef,
        args: &serde_json::Value,
        meta: &serde_json::Value,
        uniqueness: Uniqueness,
    ) -> Result<(), QueueError>;
}
