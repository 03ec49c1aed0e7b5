use async_trait::async_trait;
use std::error::Error as StdError;
use std::sync::Arc;

use super::executor::BatchExecutor;
use super::types::Deadline;
use crate::common::BatchError;
use crate::config::BatchConfig;
use crate::diagnostics::DiagnosticSink;
use crate::taskpool::TaskPool;

/// Remote collaborator that deletes one named resource.
#[async_trait]
pub trait ResourceDeleter: Send + Sync + 'static {
    /// Whatever the remote API hands back for a deletion; discarded by [`DeleteAllInList`].
    type Deleted: Send + 'static;
    type Error: StdError + Send + Sync + 'static;

    async fn delete(&self, key: &str) -> Result<Self::Deleted, Self::Error>;
}

/// Concurrently delete all given resources.
///
/// Succeeds only when every deletion reports success. On failure nothing is
/// rolled back: resources deleted before the failing unit stay deleted, so
/// a failed call leaves the remote side possibly partially applied.
pub struct DeleteAllInList<A: ResourceDeleter> {
    api: Arc<A>,
    pool: TaskPool,
    executor: BatchExecutor,
}

impl<A: ResourceDeleter> DeleteAllInList<A> {
    pub const LABEL: &'static str = "deleting resources";

    pub fn new(pool: TaskPool, api: Arc<A>) -> Self {
        Self {
            api,
            pool,
            executor: BatchExecutor::new().with_label(Self::LABEL),
        }
    }

    pub fn from_config(config: &BatchConfig, api: Arc<A>) -> Self {
        Self::new(config.build_pool(), api).with_deadline(config.deadline())
    }

    pub fn with_deadline(mut self, deadline: impl Into<Deadline>) -> Self {
        self.executor = self.executor.with_deadline(deadline);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.executor = self.executor.with_sink(sink);
        self
    }

    pub fn pool(&self) -> &TaskPool {
        &self.pool
    }

    pub fn deadline(&self) -> Deadline {
        self.executor.deadline()
    }

    pub async fn execute<I>(&self, names: I) -> Result<(), BatchError<A::Error>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.execute_on(&self.pool, names).await
    }

    pub async fn execute_on<I>(&self, pool: &TaskPool, names: I) -> Result<(), BatchError<A::Error>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let api = self.api.clone();
        self.executor
            .execute_batch(pool, names, move |name| {
                let api = api.clone();
                async move { api.delete(&name).await.map(drop) }
            })
            .await
            .map(|deleted| {
                log::debug!("Deleted {} resources", deleted.len());
            })
    }
}
