use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::WorkerRef;
use crate::impls::QueuedJob;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("handler not found for worker={0}")]
    HandlerNotFound(WorkerRef),

    #[error("duplicate handler for worker={0}")]
    DuplicateHandler(WorkerRef),

    #[error("{0}")]
    Failed(String),
}

/// Business logic behind one work type.
///
/// Takes the whole `QueuedJob` so the handler can decode args as it likes.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &QueuedJob) -> Result<(), RuntimeError>;
}

/// Registry of handlers (worker -> handler).
///
/// Built during initialization (mutable), used during runtime (immutable).
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<WorkerRef, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        worker: WorkerRef,
        handler: Arc<dyn JobHandler>,
    ) -> Result<(), RuntimeError> {
        if self.handlers.contains_key(&worker) {
            return Err(RuntimeError::DuplicateHandler(worker));
        }
        self.handlers.insert(worker, handler);
        Ok(())
    }

    pub fn get(&self, worker: &WorkerRef) -> Option<&Arc<dyn JobHandler>> {
        self.handlers.get(worker)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Runtime executes a `QueuedJob` by dispatching to a registered handler.
pub struct Runtime {
    registry: Arc<HandlerRegistry>,
}

impl Runtime {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Execute one job.
    pub async fn execute(&self, job: &QueuedJob) -> Result<(), RuntimeError> {
        let handler = self
            .registry
            .get(&job.worker)
            .ok_or_else(|| RuntimeError::HandlerNotFound(job.worker.clone()))?;

        handler.handle(job).await
    }
}
