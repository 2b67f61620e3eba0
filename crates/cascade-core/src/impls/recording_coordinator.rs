//! RecordingCoordinator - 結果を記録するだけのコーディネータ
//!
//! テストと CLI のデモで、superjob の終端結果を観測するために使います。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::{Subjob, SubjobId, SuperjobId, WorkerRef};
use crate::ports::{CoordinatorError, SuperjobCoordinator};

/// One failure report received from the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub superjob_id: SuperjobId,
    pub subjob_id: SubjobId,
    pub worker: Option<WorkerRef>,
    pub args: serde_json::Value,
    pub cause: String,
}

#[derive(Default)]
struct Recorded {
    completed: Vec<SuperjobId>,
    failures: Vec<FailureReport>,
}

/// `SuperjobCoordinator` that keeps every report in memory.
#[derive(Clone, Default)]
pub struct RecordingCoordinator {
    recorded: Arc<Mutex<Recorded>>,
}

impl RecordingCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Superjobs reported complete, in report order (duplicates kept).
    pub async fn completed(&self) -> Vec<SuperjobId> {
        self.recorded.lock().await.completed.clone()
    }

    pub async fn failures(&self) -> Vec<FailureReport> {
        self.recorded.lock().await.failures.clone()
    }

    /// Whether the superjob has reached a terminal outcome.
    pub async fn is_settled(&self, superjob_id: SuperjobId) -> bool {
        let recorded = self.recorded.lock().await;
        recorded.completed.contains(&superjob_id)
            || recorded
                .failures
                .iter()
                .any(|f| f.superjob_id == superjob_id)
    }
}

#[async_trait]
impl SuperjobCoordinator for RecordingCoordinator {
    async fn complete(&self, superjob_id: SuperjobId) -> Result<(), CoordinatorError> {
        info!(%superjob_id, "superjob complete");
        self.recorded.lock().await.completed.push(superjob_id);
        Ok(())
    }

    async fn error(
        &self,
        superjob_id: SuperjobId,
        worker: Option<&WorkerRef>,
        item: &Subjob,
        cause: &str,
    ) -> Result<(), CoordinatorError> {
        warn!(%superjob_id, subjob_id = %item.id, cause, "superjob branch failed");
        self.recorded.lock().await.failures.push(FailureReport {
            superjob_id,
            subjob_id: item.id,
            worker: worker.cloned(),
            args: item.args.clone(),
            cause: cause.to_string(),
        });
        Ok(())
    }
}
