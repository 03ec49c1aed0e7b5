use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::{FutureExt, TryStreamExt};

use super::types::{BatchState, Deadline};
use crate::common::{BatchError, BatchFailure};
use crate::diagnostics::{DiagnosticSink, NullSink};
use crate::taskpool::TaskPool;

/// Fans a per-key operation out over a [`TaskPool`] and gathers the results.
///
/// One unit of work is submitted per key. The batch succeeds only if every
/// unit succeeds within the deadline; results come back in the order the
/// keys were given, whatever order the units finished in. Any failure ends
/// the batch with a single [`BatchError`] and no partial results.
///
/// The executor holds no pool of its own, so one executor can be reused
/// against any number of pools.
#[derive(Clone)]
pub struct BatchExecutor {
    label: &'static str,
    deadline: Deadline,
    sink: Arc<dyn DiagnosticSink>,
}

impl BatchExecutor {
    pub const DEFAULT_LABEL: &'static str = "processing keys";

    pub fn new() -> Self {
        Self {
            label: Self::DEFAULT_LABEL,
            deadline: Deadline::Unbounded,
            sink: Arc::new(NullSink),
        }
    }

    /// Set the name used in the trace line and in errors, e.g. `"deleting clients"`
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn with_deadline(mut self, deadline: impl Into<Deadline>) -> Self {
        self.deadline = deadline.into();
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Run `operation` once per key on `pool` and collect every result.
    ///
    /// `operation` is called on the current task to build each unit; the
    /// returned future is what runs on the pool. Duplicate keys are processed
    /// independently and get their own result slots. An empty key list
    /// returns an empty result without submitting anything.
    ///
    /// # Errors
    ///
    /// Returns a [`BatchError`] whose cause is:
    /// - [`BatchFailure::Operation`] when a unit's operation fails,
    /// - [`BatchFailure::Timeout`] when the deadline elapses first,
    /// - [`BatchFailure::Interrupted`] when a unit cannot report an outcome.
    ///
    /// Units that already completed are not undone, and units still running
    /// when the batch fails keep running.
    pub async fn execute_batch<I, F, Fut, T, E>(
        &self,
        pool: &TaskPool,
        keys: I,
        operation: F,
    ) -> Result<Vec<T>, BatchError<E>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: StdError + Send + 'static,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();

        self.sink.trace(&format!("{}: {}", self.label, keys.join(",")));

        if keys.is_empty() {
            log::debug!("No keys to process for '{}'", self.label);
            return Ok(Vec::new());
        }

        let mut pending: FuturesUnordered<_> = keys
            .iter()
            .enumerate()
            .map(|(slot, key)| {
                let key = key.clone();
                let unit = operation(key.clone());
                pool.submit(unit).map(move |joined| match joined {
                    Ok(Ok(value)) => Ok((slot, value)),
                    Ok(Err(source)) => Err(BatchFailure::Operation { key, source }),
                    Err(reason) => Err(BatchFailure::Interrupted { key, reason }),
                })
            })
            .collect();
        let state = self.advance(BatchState::Pending, BatchState::Dispatched, keys.len());

        // Units report in completion order; the first failure ends the wait
        let aggregate = async move {
            let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None)
                .take(pending.len())
                .collect();
            while let Some((slot, value)) = pending.try_next().await? {
                slots[slot] = Some(value);
            }
            Ok::<_, BatchFailure<E>>(slots.into_iter().flatten().collect::<Vec<T>>())
        };

        let outcome = match self.deadline {
            Deadline::Unbounded => aggregate.await,
            Deadline::After(limit) => tokio::time::timeout(limit, aggregate)
                .await
                .unwrap_or_else(|_| {
                    Err(BatchFailure::Timeout {
                        deadline: limit,
                        submitted: keys.len(),
                    })
                }),
        };

        match outcome {
            Ok(results) => {
                self.advance(state, BatchState::Complete, keys.len());
                Ok(results)
            }
            Err(failure) => {
                let terminal = BatchState::from_failure(&failure);
                self.advance(state, terminal, keys.len());
                log::warn!("'{}' failed: {}", self.label, failure);
                Err(BatchError::new(self.label, failure))
            }
        }
    }

    fn advance(&self, from: BatchState, to: BatchState, units: usize) -> BatchState {
        debug_assert!(!from.is_terminal(), "batch already ended in {from}");
        log::debug!(
            "'{}' batch of {} units: {} -> {} (deadline: {})",
            self.label,
            units,
            from,
            to,
            self.deadline
        );
        to
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("label", &self.label)
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// Run `operation` once per key on `pool`, bounded by `deadline`.
///
/// Shorthand for a default [`BatchExecutor`] with the given deadline.
pub async fn execute_batch<I, F, Fut, T, E>(
    pool: &TaskPool,
    keys: I,
    deadline: Deadline,
    operation: F,
) -> Result<Vec<T>, BatchError<E>>
where
    I: IntoIterator,
    I::Item: Into<String>,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: StdError + Send + 'static,
{
    BatchExecutor::new()
        .with_deadline(deadline)
        .execute_batch(pool, keys, operation)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    #[test]
    fn test_executor_configuration() {
        let executor = BatchExecutor::new()
            .with_label("getting nodes")
            .with_deadline(Duration::from_secs(5));

        assert_eq!(executor.label(), "getting nodes");
        assert_eq!(executor.deadline(), Deadline::After(Duration::from_secs(5)));
        assert_eq!(BatchExecutor::default().deadline(), Deadline::Unbounded);
    }

    #[tokio::test]
    async fn test_results_follow_key_order() {
        let pool = TaskPool::new(4);

        let results = execute_batch(&pool, ["a", "b", "c"], Deadline::Unbounded, |key| async move {
            Ok::<_, io::Error>(key.to_uppercase())
        })
        .await
        .expect("every unit succeeds");

        assert_eq!(results, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_failure_carries_label_and_key() {
        let pool = TaskPool::new(4);
        let executor = BatchExecutor::new().with_label("deleting clients");

        let error = executor
            .execute_batch(&pool, ["n1", "n2"], |key| async move {
                if key == "n2" {
                    Err(io::Error::other("server error"))
                } else {
                    Ok(())
                }
            })
            .await
            .expect_err("n2 fails");

        assert_eq!(error.operation(), "deleting clients");
        assert_eq!(error.key(), Some("n2"));
    }
}
