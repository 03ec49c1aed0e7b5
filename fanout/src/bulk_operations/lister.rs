use async_trait::async_trait;
use std::error::Error as StdError;
use std::sync::Arc;

use super::executor::BatchExecutor;
use super::types::Deadline;
use crate::common::{BatchError, BatchFailure};
use crate::config::BatchConfig;
use crate::diagnostics::DiagnosticSink;
use crate::taskpool::TaskPool;

/// Remote collaborator that knows every resource key and can fetch one resource.
///
/// Both calls may run concurrently from many pool workers.
#[async_trait]
pub trait KeySource: Send + Sync + 'static {
    type Resource: Send + 'static;
    type Error: StdError + Send + Sync + 'static;

    /// List the names of every resource, e.g. all node names.
    async fn list_keys(&self) -> Result<Vec<String>, Self::Error>;

    /// Fetch a single resource by key.
    async fn fetch(&self, key: &str) -> Result<Self::Resource, Self::Error>;
}

/// Concurrently fetch resources from a [`KeySource`].
///
/// Three ways to pick what gets fetched:
/// - [`execute`](Self::execute) fetches every key the source lists,
/// - [`execute_matching`](Self::execute_matching) fetches the listed keys a predicate accepts,
/// - [`execute_keys`](Self::execute_keys) fetches exactly the given keys without listing.
///
/// Each has an `_on` variant taking the pool to run on instead of the default one.
///
/// # Examples
///
/// ```no_run
/// use fanout::{ListResources, TaskPool};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example<A: fanout::KeySource>(api: Arc<A>) {
/// let lister = ListResources::new(TaskPool::new(8), api)
///     .with_deadline(Duration::from_secs(30));
///
/// let web_nodes = lister
///     .execute_matching(|name| name.starts_with("web-"))
///     .await;
/// # }
/// ```
pub struct ListResources<A: KeySource> {
    api: Arc<A>,
    pool: TaskPool,
    executor: BatchExecutor,
}

impl<A: KeySource> ListResources<A> {
    pub const LABEL: &'static str = "getting resources";

    pub fn new(pool: TaskPool, api: Arc<A>) -> Self {
        Self {
            api,
            pool,
            executor: BatchExecutor::new().with_label(Self::LABEL),
        }
    }

    /// Build with the pool size and deadline from `config`
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

    pub async fn execute(&self) -> Result<Vec<A::Resource>, BatchError<A::Error>> {
        self.execute_on(&self.pool).await
    }

    pub async fn execute_matching<P>(
        &self,
        selector: P,
    ) -> Result<Vec<A::Resource>, BatchError<A::Error>>
    where
        P: Fn(&str) -> bool,
    {
        self.execute_matching_on(&self.pool, selector).await
    }

    pub async fn execute_keys<I>(&self, keys: I) -> Result<Vec<A::Resource>, BatchError<A::Error>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.execute_keys_on(&self.pool, keys).await
    }

    pub async fn execute_on(
        &self,
        pool: &TaskPool,
    ) -> Result<Vec<A::Resource>, BatchError<A::Error>> {
        let keys = self.enumerate().await?;
        self.execute_keys_on(pool, keys).await
    }

    /// Fetch the listed keys accepted by `selector`, in listing order.
    pub async fn execute_matching_on<P>(
        &self,
        pool: &TaskPool,
        selector: P,
    ) -> Result<Vec<A::Resource>, BatchError<A::Error>>
    where
        P: Fn(&str) -> bool,
    {
        let keys = self.enumerate().await?;
        self.execute_keys_on(pool, keys.into_iter().filter(|key| selector(key)))
            .await
    }

    pub async fn execute_keys_on<I>(
        &self,
        pool: &TaskPool,
        keys: I,
    ) -> Result<Vec<A::Resource>, BatchError<A::Error>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let api = self.api.clone();
        self.executor
            .execute_batch(pool, keys, move |key| {
                let api = api.clone();
                async move { api.fetch(&key).await }
            })
            .await
    }

    async fn enumerate(&self) -> Result<Vec<String>, BatchError<A::Error>> {
        self.api.list_keys().await.map_err(|source| {
            log::warn!("Failed to list keys for '{}': {}", self.executor.label(), source);
            BatchError::new(self.executor.label(), BatchFailure::Enumeration { source })
        })
    }
}
