use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::{Duration, sleep, timeout};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cascade_core::app::{
    HandlerRegistry, JobHandler, NodeSpec, Orchestrator, Runtime, RuntimeError, TreeBuilder,
    WorkerGroup,
};
use cascade_core::config::WorkerConfig;
use cascade_core::domain::WorkerRef;
use cascade_core::impls::{
    InMemoryQueueClient, InMemorySubjobStore, QueuedJob, RecordingCoordinator,
};
use cascade_core::ports::{SystemClock, UlidGenerator};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct HelloArgs {
    name: String,
}

struct HelloHandler;

#[async_trait]
impl JobHandler for HelloHandler {
    async fn handle(&self, job: &QueuedJob) -> Result<(), RuntimeError> {
        let args: HelloArgs = serde_json::from_value(job.args.clone())
            .map_err(|e| RuntimeError::Failed(format!("json decode: {e}")))?;

        // 並列ブランチの入れ替わりが見えるように少し待つ
        sleep(Duration::from_millis(20 * args.name.len() as u64)).await;
        info!(job_id = %job.job_id, "Hello, {}!", args.name);
        Ok(())
    }
}

fn hello(name: &str) -> NodeSpec {
    NodeSpec::leaf("hello")
        .args(serde_json::json!({ "name": name }))
        .named(name)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cascade_core=debug,cascade_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env()?;
    info!(workers = config.workers, pop_timeout = ?config.pop_timeout, "worker config loaded");

    // (A) A → (C ∥ D) → E
    let ids = Arc::new(UlidGenerator::new(SystemClock));
    let tree = TreeBuilder::new(ids.as_ref()).build(NodeSpec::sequential(vec![
        hello("A"),
        NodeSpec::parallel(vec![hello("C"), hello("Dee")]).named("B"),
        hello("E"),
    ]))?;

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

    // (B) handler を登録して worker を起動
    let mut registry = HandlerRegistry::new();
    registry.register(WorkerRef::new("hello"), Arc::new(HelloHandler))?;
    let runtime = Arc::new(Runtime::new(Arc::new(registry)));
    let workers = WorkerGroup::spawn(config, queue, runtime, orchestrator.clone());

    // (C) root を dispatch
    orchestrator.dispatch(tree.root_id).await?;
    info!(superjob_id = %tree.superjob_id, "superjob dispatched");

    // (D) coordinator に結果が届くまでポーリング
    let settled = timeout(SETTLE_TIMEOUT, async {
        while !coordinator.is_settled(tree.superjob_id).await {
            sleep(Duration::from_millis(50)).await;
        }
    })
    .await;

    println!("counts: {:?}", store.counts(tree.superjob_id).await);
    println!("completed: {:?}", coordinator.completed().await);
    for failure in coordinator.failures().await {
        println!("failed: subjob={} cause={}", failure.subjob_id, failure.cause);
    }

    // (E) graceful shutdown
    let abnormal = workers.shutdown_and_join().await;
    if abnormal > 0 {
        warn!(abnormal, "some workers ended abnormally");
    }
    if settled.is_err() {
        return Err(format!("superjob {} did not settle in {SETTLE_TIMEOUT:?}", tree.superjob_id).into());
    }
    Ok(())
}
