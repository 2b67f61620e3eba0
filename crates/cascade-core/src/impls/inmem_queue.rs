//! InMemoryQueueClient - 開発用のジョブキュー
//!
//! # 実装詳細
//! - pending は VecDeque、push 時に Notify で待機中の worker を起こす
//! - work type ごとの unique 設定を持ち、有効なら同じ args の重複 push を捨てる
//!   （`Uniqueness::Suspend` の push だけは設定に関係なく受け付ける）
//! - `set_available(false)` で投入失敗（QueueUnavailable）を再現できる

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};
use tracing::debug;

use crate::domain::{JobId, WorkerRef};
use crate::ports::{QueueClient, QueueError, UniqueOptions, Uniqueness};

/// One job as seen by the queue and its workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub job_id: JobId,
    pub worker: WorkerRef,
    pub args: serde_json::Value,
    pub meta: serde_json::Value,
}

#[derive(Default)]
struct QueueState {
    /// Waiting for a worker.
    pending: VecDeque<QueuedJob>,

    /// Every accepted push, in order.
    ///
    /// Never pruned, even after a worker pops the job. Meant for tests and
    /// short demo runs, not long-lived processes.
    accepted: Vec<QueuedJob>,

    /// Pushes dropped by uniqueness. Never pruned either.
    deduplicated: Vec<JobId>,
}

/// In-memory `QueueClient` with a blocking pop for workers.
pub struct InMemoryQueueClient {
    state: Arc<Mutex<QueueState>>,
    unique: std::sync::Mutex<HashMap<WorkerRef, UniqueOptions>>,
    available: AtomicBool,
    notify: Arc<Notify>,
}

impl InMemoryQueueClient {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            unique: std::sync::Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Configure uniqueness on a work type.
    pub fn set_unique_options(&self, worker: WorkerRef, options: UniqueOptions) {
        self.unique
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(worker, options);
    }

    pub fn unique_options(&self, worker: &WorkerRef) -> Option<UniqueOptions> {
        self.unique
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(worker)
            .cloned()
    }

    /// Toggle whether pushes are accepted.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Take the next pending job, waiting up to `timeout`.
    pub async fn pop(&self, timeout: Duration) -> Option<QueuedJob> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(job) = state.pending.pop_front() {
                    return Some(job);
                }
            }
            // notify_one は待機者がいなければ permit を残すので取りこぼさない
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return None;
            }
        }
    }

    /// Every accepted push, in order.
    pub async fn accepted(&self) -> Vec<QueuedJob> {
        self.state.lock().await.accepted.clone()
    }

    /// Ids of pushes dropped as duplicates.
    pub async fn deduplicated(&self) -> Vec<JobId> {
        self.state.lock().await.deduplicated.clone()
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }
}

impl Default for InMemoryQueueClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueClient for InMemoryQueueClient {
    async fn push(
        &self,
        job_id: JobId,
        worker: &WorkerRef,
        args: &serde_json::Value,
        meta: &serde_json::Value,
        uniqueness: Uniqueness,
    ) -> Result<(), QueueError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable(format!(
                "push of {job_id} refused"
            )));
        }

        let unique = match uniqueness {
            Uniqueness::Enforce => self.unique_options(worker),
            Uniqueness::Suspend => None,
        };
        {
            let mut state = self.state.lock().await;
            let duplicate = unique.is_some_and(|options| options.by_args)
                && state
                    .pending
                    .iter()
                    .any(|job| &job.worker == worker && &job.args == args);
            if duplicate {
                debug!(%job_id, %worker, "dropping duplicate push");
                state.deduplicated.push(job_id);
                return Ok(());
            }

            let job = QueuedJob {
                job_id,
                worker: worker.clone(),
                args: args.clone(),
                meta: meta.clone(),
            };
            state.accepted.push(job.clone());
            state.pending.push_back(job);
        }

        self.notify.notify_one();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;
    use ulid::Ulid;

    fn job_id() -> JobId {
        JobId::from_ulid(Ulid::new())
    }

    #[tokio::test]
    async fn push_then_pop() {
        let queue = InMemoryQueueClient::new();
        let id = job_id();
        let worker = WorkerRef::new("resize");
        queue
            .push(
                id,
                &worker,
                &serde_json::json!({"w": 10}),
                &serde_json::Value::Null,
                Uniqueness::Enforce,
            )
            .await
            .unwrap();

        let job = queue.pop(Duration::from_secs(1)).await.unwrap();
        assert_eq!(job.job_id, id);
        assert_eq!(job.worker, worker);
        assert_eq!(job.args, serde_json::json!({"w": 10}));
        assert_eq!(queue.pending_len().await, 0);
    }

    #[tokio::test]
    async fn pop_times_out_when_empty() {
        let queue = InMemoryQueueClient::new();
        let start = Instant::now();
        let popped = queue.pop(Duration::from_millis(200)).await;
        assert!(popped.is_none());
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn push_wakes_waiting_pop() {
        let queue = Arc::new(InMemoryQueueClient::new());
        let id = job_id();

        let waiter = tokio::spawn({
            let queue = queue.clone();
            async move { queue.pop(Duration::from_secs(5)).await }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        queue
            .push(
                id,
                &WorkerRef::new("w"),
                &serde_json::Value::Null,
                &serde_json::Value::Null,
                Uniqueness::Enforce,
            )
            .await
            .unwrap();

        let popped = waiter.await.unwrap().unwrap();
        assert_eq!(popped.job_id, id);
    }

    #[tokio::test]
    async fn unavailable_queue_refuses_push() {
        let queue = InMemoryQueueClient::new();
        queue.set_available(false);
        let err = queue
            .push(
                job_id(),
                &WorkerRef::new("w"),
                &serde_json::Value::Null,
                &serde_json::Value::Null,
                Uniqueness::Suspend,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Unavailable(_)));
        assert!(queue.accepted().await.is_empty());
    }

    #[tokio::test]
    async fn unique_options_drop_duplicate_args() {
        let queue = InMemoryQueueClient::new();
        let worker = WorkerRef::new("w");
        queue.set_unique_options(worker.clone(), UniqueOptions { by_args: true });
        let args = serde_json::json!({"k": 1});

        let first = job_id();
        let second = job_id();
        let null = serde_json::Value::Null;
        queue.push(first, &worker, &args, &null, Uniqueness::Enforce).await.unwrap();
        queue.push(second, &worker, &args, &null, Uniqueness::Enforce).await.unwrap();

        assert_eq!(queue.accepted().await.len(), 1);
        assert_eq!(queue.deduplicated().await, vec![second]);
    }

    #[tokio::test]
    async fn suspended_push_lands_without_touching_the_options() {
        let queue = InMemoryQueueClient::new();
        let worker = WorkerRef::new("w");
        let options = UniqueOptions { by_args: true };
        queue.set_unique_options(worker.clone(), options.clone());
        let args = serde_json::json!({"k": 1});
        let null = serde_json::Value::Null;

        let first = job_id();
        let suspended = job_id();
        let enforced = job_id();
        queue.push(first, &worker, &args, &null, Uniqueness::Enforce).await.unwrap();
        queue.push(suspended, &worker, &args, &null, Uniqueness::Suspend).await.unwrap();
        queue.push(enforced, &worker, &args, &null, Uniqueness::Enforce).await.unwrap();

        let accepted: Vec<JobId> = queue.accepted().await.iter().map(|j| j.job_id).collect();
        assert_eq!(accepted, vec![first, suspended]);
        assert_eq!(queue.deduplicated().await, vec![enforced]);
        assert_eq!(queue.unique_options(&worker), Some(options));
    }
}
