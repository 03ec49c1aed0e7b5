use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::common::PoolError;

/// Shared pool running units of work on the tokio runtime.
///
/// At most `capacity` units run at once; the rest wait for a slot. Clones
/// share the same slots, so one pool can serve many overlapping batches.
/// The pool shuts down when [`TaskPool::shutdown`] is called or when the
/// last clone is dropped; units still waiting or running then resolve to
/// [`PoolError::Cancelled`].
#[derive(Clone)]
pub struct TaskPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    semaphore: Arc<Semaphore>,
    cancel_token: CancellationToken,
    capacity: usize,
}

impl TaskPool {
    pub fn new(n_tasks: usize) -> TaskPool {
        let capacity = n_tasks.max(1);
        let semaphore = Arc::new(Semaphore::new(capacity));
        let cancel_token = CancellationToken::new();

        TaskPool {
            inner: Arc::new(PoolInner {
                semaphore,
                cancel_token,
                capacity,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of slots not currently held by a running unit
    pub fn available_permits(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.cancel_token.is_cancelled()
    }

    /// Stop accepting work and cancel every waiting or running unit.
    pub fn shutdown(&self) {
        self.inner.close();
    }

    /// Submit a unit of work and get a handle to its eventual output.
    ///
    /// The unit starts as soon as a slot is free, whether or not the handle
    /// is ever polled. Dropping the handle detaches the unit; it is not
    /// cancelled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit<F, T>(&self, func: F) -> PendingHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = self.inner.semaphore.clone();
        let token = self.inner.cancel_token.clone();
        let handle = tokio::spawn(async move {
            let main = async {
                let Ok(_permit) = semaphore.acquire().await else {
                    return Err(PoolError::Closed);
                };
                Ok(func.await)
            };

            tokio::select! {
                result = main => result,
                () = token.cancelled() => Err(PoolError::Cancelled),
            }
        });

        PendingHandle { handle }
    }
}

impl std::fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool")
            .field("capacity", &self.capacity())
            .field("available_permits", &self.available_permits())
            .field("is_shutdown", &self.is_shutdown())
            .finish()
    }
}

impl PoolInner {
    fn close(&self) {
        if !self.cancel_token.is_cancelled() {
            log::debug!("Shutting down task pool with capacity {}", self.capacity);
        }
        self.semaphore.close();
        self.cancel_token.cancel();
    }
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        self.close();
    }
}

/// Handle to one submitted unit of work.
///
/// Resolves to the unit's output, or to a [`PoolError`] when the pool could
/// not deliver it.
#[derive(Debug)]
pub struct PendingHandle<T> {
    handle: JoinHandle<Result<T, PoolError>>,
}

impl<T> Future for PendingHandle<T> {
    type Output = Result<T, PoolError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle)
            .poll(cx)
            .map(|joined| joined.unwrap_or_else(|e| Err(join_failure(e))))
    }
}

fn join_failure(error: JoinError) -> PoolError {
    if !error.is_panic() {
        return PoolError::Aborted;
    }

    let payload = error.into_panic();
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };
    PoolError::Panicked(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_submit_returns_output() {
        let pool = TaskPool::new(2);

        let handle = pool.submit(async { 21 * 2 });

        assert_eq!(handle.await, Ok(42));
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let pool = TaskPool::new(0);
        assert_eq!(pool.capacity(), 1);
        assert_eq!(pool.available_permits(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_never_exceeds_capacity() {
        let pool = TaskPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                pool.submit(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await, Ok(()));
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_running_units() {
        let pool = TaskPool::new(1);
        let handle = pool.submit(async {
            sleep(Duration::from_secs(10)).await;
        });

        sleep(Duration::from_millis(10)).await;
        pool.shutdown();

        assert!(pool.is_shutdown());
        assert_eq!(handle.await, Err(PoolError::Cancelled));
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails() {
        let pool = TaskPool::new(1);
        pool.shutdown();

        let result = pool.submit(async { 1 }).await;

        assert!(matches!(
            result,
            Err(PoolError::Closed) | Err(PoolError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_dropping_last_clone_shuts_down() {
        let pool = TaskPool::new(1);
        let handle = pool.submit(async {
            sleep(Duration::from_secs(10)).await;
        });

        drop(pool);

        assert_eq!(handle.await, Err(PoolError::Cancelled));
    }

    #[tokio::test]
    async fn test_panicking_unit_is_reported() {
        let pool = TaskPool::new(1);

        let result: Result<(), PoolError> = pool
            .submit(async {
                panic!("remote client exploded");
            })
            .await;

        assert_eq!(
            result,
            Err(PoolError::Panicked("remote client exploded".to_string()))
        );
    }
}
