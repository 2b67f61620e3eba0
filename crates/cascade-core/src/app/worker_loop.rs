//! WorkerLoop - キューからジョブを取り出して実行する
//!
//! # フロー
//! 1. InMemoryQueueClient::pop() で QueuedJob を取得
//! 2. Orchestrator::mark_started() で Queued → Running
//! 3. Handler 実行
//! 4. 成功なら complete_job()、失敗なら fail_job()（assigned job id で対象ノードを引く）

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::app::Orchestrator;
use crate::app::runtime::Runtime;
use crate::config::WorkerConfig;
use crate::impls::InMemoryQueueClient;

/// Worker group handle.
/// - `request_shutdown` で新しいジョブの取得を止める
/// - `shutdown_and_join()` で全ワーカーの終了を待てる
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

struct WorkerContext {
    config: WorkerConfig,
    queue: Arc<InMemoryQueueClient>,
    runtime: Arc<Runtime>,
    orchestrator: Arc<Orchestrator>,
}

impl WorkerGroup {
    /// Spawn `config.workers` workers.
    pub fn spawn(
        config: WorkerConfig,
        queue: Arc<InMemoryQueueClient>,
        runtime: Arc<Runtime>,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let context = Arc::new(WorkerContext {
            config,
            queue,
            runtime,
            orchestrator,
        });

        let mut joins = Vec::with_capacity(context.config.workers);
        for worker_id in 0..context.config.workers {
            let context = Arc::clone(&context);
            let mut rx = shutdown_rx.clone();
            joins.push(tokio::spawn(async move {
                worker_loop(worker_id, &context, &mut rx).await;
            }));
        }

        Self { shutdown_tx, joins }
    }

    /// Stop taking new jobs. In-flight handlers are not cancelled.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    ///
    /// Returns how many workers ended abnormally (panicked or were cancelled).
    pub async fn shutdown_and_join(self) -> usize {
        self.request_shutdown();
        let mut abnormal = 0;
        for (worker_id, join) in self.joins.into_iter().enumerate() {
            if let Err(e) = join.await {
                warn!(worker_id, error = %e, "worker task ended abnormally");
                abnormal += 1;
            }
        }
        abnormal
    }
}

async fn worker_loop(
    worker_id: usize,
    context: &WorkerContext,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let job = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            job = context.queue.pop(context.config.pop_timeout) => job,
        };
        let Some(job) = job else {
            continue;
        };
        debug!(worker_id, job_id = %job.job_id, worker = %job.worker, "picked up job");

        if let Err(e) = context.orchestrator.mark_started(job.job_id).await {
            warn!(worker_id, job_id = %job.job_id, error = %e, "start report failed");
        }

        let reported = match context.runtime.execute(&job).await {
            Ok(()) => context.orchestrator.complete_job(job.job_id).await,
            Err(err) => {
                context
                    .orchestrator
                    .fail_job(job.job_id, &err.to_string())
                    .await
            }
        };
        if let Err(e) = reported {
            warn!(worker_id, job_id = %job.job_id, error = %e, "completion callback failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::app::builder::{NodeSpec, SuperjobTree, TreeBuilder};
    use crate::app::runtime::{HandlerRegistry, JobHandler, RuntimeError};
    use crate::domain::{SubjobStatus, WorkerRef};
    use crate::impls::{InMemorySubjobStore, QueuedJob, RecordingCoordinator};
    use crate::ports::{
        IdGenerator, QueueClient, SubjobStore, SystemClock, UlidGenerator, Uniqueness,
    };

    struct Succeed;

    #[async_trait]
    impl JobHandler for Succeed {
        async fn handle(&self, _job: &QueuedJob) -> Result<(), RuntimeError> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(())
        }
    }

    struct Fail;

    #[async_trait]
    impl JobHandler for Fail {
        async fn handle(&self, job: &QueuedJob) -> Result<(), RuntimeError> {
            Err(RuntimeError::Failed(format!("cannot handle {}", job.args)))
        }
    }

    async fn run(root: NodeSpec) -> (InMemorySubjobStore, RecordingCoordinator, SuperjobTree) {
        let ids = Arc::new(UlidGenerator::new(SystemClock));
        let tree = TreeBuilder::new(ids.as_ref()).build(root).unwrap();
        let store = InMemorySubjobStore::new();
        store.insert_tree(tree.nodes.clone()).await;
        let queue = Arc::new(InMemoryQueueClient::new());
        let coordinator = RecordingCoordinator::new();
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(store.clone()),
            queue.clone(),
            Arc::new(coordinator.clone()),
            ids,
        ));

        let mut registry = HandlerRegistry::new();
        registry.register(WorkerRef::new("ok"), Arc::new(Succeed)).unwrap();
        registry.register(WorkerRef::new("bad"), Arc::new(Fail)).unwrap();
        let runtime = Arc::new(Runtime::new(Arc::new(registry)));

        let config = WorkerConfig {
            workers: 3,
            pop_timeout: Duration::from_millis(20),
        };
        let group = WorkerGroup::spawn(config, queue, runtime, orchestrator.clone());

        orchestrator.dispatch(tree.root_id).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !coordinator.is_settled(tree.superjob_id).await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(group.shutdown_and_join().await, 0);
        (store, coordinator, tree)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn workers_drive_tree_to_completion() {
        let (store, coordinator, tree) = run(NodeSpec::sequential(vec![
            NodeSpec::leaf("ok").named("A"),
            NodeSpec::parallel(vec![
                NodeSpec::leaf("ok"),
                NodeSpec::leaf("ok"),
                NodeSpec::leaf("ok"),
            ]),
            NodeSpec::batch(vec![NodeSpec::leaf("ok"), NodeSpec::leaf("ok")]),
            NodeSpec::leaf("ok").named("E"),
        ]))
        .await;

        assert_eq!(coordinator.completed().await, vec![tree.superjob_id]);
        assert!(coordinator.failures().await.is_empty());
        let counts = store.counts(tree.superjob_id).await;
        assert_eq!(counts.complete, counts.total());
        assert_eq!(counts.descendants_complete, counts.total());
        let e = store.load(tree.id_of("E").unwrap()).await.unwrap();
        assert_eq!(e.status, SubjobStatus::Complete);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failing_handler_reports_to_coordinator() {
        let (store, coordinator, tree) = run(NodeSpec::sequential(vec![
            NodeSpec::leaf("bad").args(serde_json::json!({"n": 3})).named("A"),
            NodeSpec::leaf("ok").named("B"),
        ]))
        .await;

        let failures = coordinator.failures().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].cause, "cannot handle {\"n\":3}");
        assert!(coordinator.completed().await.is_empty());

        let a = store.load(tree.id_of("A").unwrap()).await.unwrap();
        let b = store.load(tree.id_of("B").unwrap()).await.unwrap();
        assert_eq!(a.status, SubjobStatus::Failed);
        assert_eq!(b.status, SubjobStatus::Initialized);
    }

    struct Panics;

    #[async_trait]
    impl JobHandler for Panics {
        async fn handle(&self, _job: &QueuedJob) -> Result<(), RuntimeError> {
            panic!("handler blew up");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panicking_worker_is_reported_on_join() {
        let ids = Arc::new(UlidGenerator::new(SystemClock));
        let queue = Arc::new(InMemoryQueueClient::new());
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(InMemorySubjobStore::new()),
            queue.clone(),
            Arc::new(RecordingCoordinator::new()),
            ids.clone(),
        ));
        let mut registry = HandlerRegistry::new();
        registry.register(WorkerRef::new("boom"), Arc::new(Panics)).unwrap();
        let runtime = Arc::new(Runtime::new(Arc::new(registry)));

        let config = WorkerConfig {
            workers: 2,
            pop_timeout: Duration::from_millis(20),
        };
        let group = WorkerGroup::spawn(config, queue.clone(), runtime, orchestrator);

        queue
            .push(
                ids.generate_job_id(),
                &WorkerRef::new("boom"),
                &serde_json::Value::Null,
                &serde_json::Value::Null,
                Uniqueness::Enforce,
            )
            .await
            .unwrap();
        // pop した時点で handler の panic は避けられない
        tokio::time::timeout(Duration::from_secs(5), async {
            while queue.pending_len().await > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(group.shutdown_and_join().await, 1);
    }
}
